//! Data source module
//!
//! Declares the expected input schema and loads the raw tables. Upstream
//! acquisition and integrity checks are external; this layer only guarantees
//! that the tables handed to the feature engineer carry the declared shape.

mod loader;
mod schema;

pub use loader::{load_interaction_aggregates, load_student_table};
pub use schema::{StudentSchema, FINAL_RESULT, ID_STUDENT, WITHDRAWN_LABEL};
