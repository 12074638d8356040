//! CSV loading for the raw tables

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{RetentionError, Result};

use super::schema::StudentSchema;

fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| {
        RetentionError::DataError(format!("cannot open {}: {}", path.display(), e))
    })?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| RetentionError::DataError(e.to_string()))
}

/// Load and validate the student table.
pub fn load_student_table(path: &Path) -> Result<DataFrame> {
    let df = read_csv(path)?;
    StudentSchema::default().validate(&df)?;
    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded student table"
    );
    Ok(df)
}

/// Load the optional per-student interaction aggregates.
///
/// A missing file is not an error: students without clickstream rollups are
/// handled downstream by the behavioral stage (absent columns, zero fills).
pub fn load_interaction_aggregates(path: &Path) -> Result<Option<DataFrame>> {
    if !path.exists() {
        warn!(path = %path.display(), "Interaction aggregates not found, skipping behavioral features");
        return Ok(None);
    }

    let df = read_csv(path)?;
    if df.column(super::schema::ID_STUDENT).is_err() {
        return Err(RetentionError::MissingColumn(
            super::schema::ID_STUDENT.to_string(),
        ));
    }

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded interaction aggregates"
    );
    Ok(Some(df))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_aggregates_is_none_not_error() {
        let result = load_interaction_aggregates(Path::new("/nonexistent/vle.csv"));
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_missing_student_table_is_error() {
        let result = load_student_table(Path::new("/nonexistent/students.csv"));
        assert!(result.is_err());
    }
}
