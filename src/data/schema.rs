//! Declared input schema for the student table
//!
//! Column presence used to be an implicit, per-call check scattered through
//! the feature stages. Here it is an explicit contract: required columns fail
//! fast at load time, optional columns are the only ones downstream stages
//! branch on.

use polars::prelude::*;

use crate::error::{RetentionError, Result};

/// Row key and label-source column names shared across the pipeline.
pub const ID_STUDENT: &str = "id_student";
pub const FINAL_RESULT: &str = "final_result";

/// Outcome value that defines the positive (withdrawal) class.
pub const WITHDRAWN_LABEL: &str = "Withdrawn";

/// Declared schema for the raw student table.
///
/// One row per (student, module, presentation). Required columns abort the
/// run when absent; optional columns are silently skipped by the feature
/// stages, which keeps the pipeline forward-compatible with schema drift.
#[derive(Debug, Clone)]
pub struct StudentSchema {
    required: Vec<&'static str>,
    optional: Vec<&'static str>,
}

impl Default for StudentSchema {
    fn default() -> Self {
        Self {
            required: vec![ID_STUDENT, "code_module", "code_presentation", FINAL_RESULT],
            optional: vec![
                // demographic
                "gender",
                "age_band",
                "highest_education",
                "region",
                "disability",
                "imd_band",
                // academic
                "num_of_prev_attempts",
                "studied_credits",
                "date_registration",
                "date_unregistration",
                "module_presentation_length",
            ],
        }
    }
}

impl StudentSchema {
    /// Required column names.
    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    /// Optional column names.
    pub fn optional(&self) -> &[&'static str] {
        &self.optional
    }

    /// Validate a table against the schema.
    ///
    /// Fails with the first missing required column; never proceeds with a
    /// partial key or absent label source.
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        for col in &self.required {
            if df.column(col).is_err() {
                if *col == FINAL_RESULT {
                    return Err(RetentionError::MissingTargetColumn(col.to_string()));
                }
                return Err(RetentionError::MissingColumn(col.to_string()));
            }
        }
        Ok(())
    }

    /// Optional columns actually present in the table.
    pub fn present_optional(&self, df: &DataFrame) -> Vec<&'static str> {
        self.optional
            .iter()
            .copied()
            .filter(|c| df.column(c).is_ok())
            .collect()
    }
}
