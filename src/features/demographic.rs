//! Demographic feature stage
//!
//! One-hot encodes the categorical demographic columns and maps the ordinal
//! deprivation band to its integer rank.

use polars::prelude::*;
use tracing::debug;

use crate::error::{RetentionError, Result};

use super::FeatureEngineer;

/// Categorical demographic columns subject to one-hot encoding.
const CATEGORICAL_COLS: [&str; 5] = ["gender", "age_band", "highest_education", "region", "disability"];

/// Ordinal rank for each IMD deprivation band (least deprived = 10).
fn imd_rank(band: &str) -> Option<i32> {
    match band {
        "0-10%" => Some(1),
        "10-20%" | "10-20" => Some(2),
        "20-30%" => Some(3),
        "30-40%" => Some(4),
        "40-50%" => Some(5),
        "50-60%" => Some(6),
        "60-70%" => Some(7),
        "70-80%" => Some(8),
        "80-90%" => Some(9),
        "90-100%" => Some(10),
        _ => None,
    }
}

impl FeatureEngineer {
    /// Build demographic features.
    ///
    /// Each categorical column present in the input is replaced by one
    /// indicator column per observed category plus an explicit `_missing`
    /// indicator, so a null category never collapses into an arbitrary
    /// reference level. Absent columns are skipped. The IMD band becomes
    /// `imd_band_numeric` with unknown labels preserved as null.
    pub fn build_demographic_features(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        for col_name in CATEGORICAL_COLS {
            if df.column(col_name).is_err() {
                continue;
            }
            result = one_hot_with_missing(&result, col_name)?;
        }

        if let Ok(col) = result.column("imd_band") {
            let ca = col
                .str()
                .map_err(|e| RetentionError::DataError(e.to_string()))?;

            let ranks: Vec<Option<i32>> = ca.into_iter().map(|v| v.and_then(imd_rank)).collect();
            let series = Series::new("imd_band_numeric".into(), ranks);

            result = result
                .with_column(series)
                .map_err(|e| RetentionError::DataError(e.to_string()))?
                .clone();
            result = result
                .drop("imd_band")
                .map_err(|e| RetentionError::DataError(e.to_string()))?;
        }

        debug!(columns = result.width(), "Demographic features built");
        Ok(result)
    }
}

/// One-hot encode a single column with an explicit missing indicator.
///
/// Categories are sorted so the produced column order is deterministic across
/// runs on the same input.
fn one_hot_with_missing(df: &DataFrame, col_name: &str) -> Result<DataFrame> {
    let column = df
        .column(col_name)
        .map_err(|_| RetentionError::MissingColumn(col_name.to_string()))?;
    let ca = column
        .str()
        .map_err(|e| RetentionError::DataError(e.to_string()))?;

    let mut categories: Vec<String> = ca
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    categories.sort();

    let mut result = df.clone();

    for category in &categories {
        let values: Vec<i32> = ca
            .into_iter()
            .map(|v| if v == Some(category.as_str()) { 1 } else { 0 })
            .collect();
        let series = Series::new(format!("{}_{}", col_name, category).into(), values);
        result = result
            .with_column(series)
            .map_err(|e| RetentionError::DataError(e.to_string()))?
            .clone();
    }

    let missing: Vec<i32> = ca
        .into_iter()
        .map(|v| if v.is_none() { 1 } else { 0 })
        .collect();
    let series = Series::new(format!("{}_missing", col_name).into(), missing);
    result = result
        .with_column(series)
        .map_err(|e| RetentionError::DataError(e.to_string()))?
        .clone();

    result
        .drop(col_name)
        .map_err(|e| RetentionError::DataError(e.to_string()))
}
