//! Academic feature stage
//!
//! Indicator and bucket features derived from prior attempts, credit load,
//! and registration timing.

use polars::prelude::*;
use tracing::debug;

use crate::error::{RetentionError, Result};

use super::FeatureEngineer;

/// Credit load at or above which a student counts as full-time.
const FULL_TIME_CREDITS: i64 = 120;

impl FeatureEngineer {
    /// Build academic features.
    ///
    /// Each block only runs when its source column is present, per the
    /// declared optional schema. The unregistration day is encoded as -1 when
    /// null so the derived column stays strictly numeric.
    pub fn build_academic_features(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();

        if let Ok(col) = df.column("num_of_prev_attempts") {
            let attempts = int_values(col.as_materialized_series())?;
            result = push_indicator(result, "has_prev_attempts", &attempts, |v| v > 0)?;
            result = push_indicator(result, "multiple_prev_attempts", &attempts, |v| v > 1)?;
        }

        if let Ok(col) = df.column("studied_credits") {
            let credits = int_values(col.as_materialized_series())?;
            result = push_indicator(result, "is_full_time", &credits, |v| v >= FULL_TIME_CREDITS)?;
            result = push_indicator(result, "is_part_time", &credits, |v| v < FULL_TIME_CREDITS)?;
        }

        if let Ok(col) = df.column("date_registration") {
            let days = opt_int_values(col.as_materialized_series())?;

            let weeks: Vec<Option<i64>> = days.iter().map(|d| d.map(|v| floor_div(v, 7))).collect();
            result = push_series(result, Series::new("registration_week".into(), weeks))?;

            let early: Vec<i32> = days
                .iter()
                .map(|d| match d {
                    Some(v) if *v <= 0 => 1,
                    _ => 0,
                })
                .collect();
            result = push_series(result, Series::new("early_registration".into(), early))?;

            let late: Vec<i32> = days
                .iter()
                .map(|d| match d {
                    Some(v) if *v > 0 => 1,
                    _ => 0,
                })
                .collect();
            result = push_series(result, Series::new("late_registration".into(), late))?;
        }

        if let Ok(col) = df.column("date_unregistration") {
            let days = opt_int_values(col.as_materialized_series())?;

            let has: Vec<i32> = days.iter().map(|d| if d.is_some() { 1 } else { 0 }).collect();
            result = push_series(result, Series::new("has_unregistration".into(), has))?;

            // -1, not null: the column must stay strictly numeric
            let week: Vec<i64> = days.iter().map(|d| d.unwrap_or(-1)).collect();
            result = push_series(result, Series::new("unregistration_week".into(), week))?;

            result = result
                .drop("date_unregistration")
                .map_err(|e| RetentionError::DataError(e.to_string()))?;
        }

        if let Ok(col) = df.column("module_presentation_length") {
            let days = int_values(col.as_materialized_series())?;
            let weeks: Vec<i64> = days.iter().map(|d| floor_div(*d, 7)).collect();
            result = push_series(result, Series::new("module_length_weeks".into(), weeks))?;
        }

        debug!(columns = result.width(), "Academic features built");
        Ok(result)
    }
}

/// Floor division matching arithmetic on negative day offsets.
fn floor_div(value: i64, divisor: i64) -> i64 {
    let q = value / divisor;
    if value % divisor != 0 && (value < 0) != (divisor < 0) {
        q - 1
    } else {
        q
    }
}

fn int_values(series: &Series) -> Result<Vec<i64>> {
    let ca = series
        .cast(&DataType::Int64)
        .map_err(|e| RetentionError::DataError(e.to_string()))?;
    let ca = ca.i64().map_err(|e| RetentionError::DataError(e.to_string()))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(0)).collect())
}

fn opt_int_values(series: &Series) -> Result<Vec<Option<i64>>> {
    let ca = series
        .cast(&DataType::Int64)
        .map_err(|e| RetentionError::DataError(e.to_string()))?;
    let ca = ca.i64().map_err(|e| RetentionError::DataError(e.to_string()))?;
    Ok(ca.into_iter().collect())
}

fn push_indicator(
    df: DataFrame,
    name: &str,
    values: &[i64],
    predicate: impl Fn(i64) -> bool,
) -> Result<DataFrame> {
    let flags: Vec<i32> = values.iter().map(|v| if predicate(*v) { 1 } else { 0 }).collect();
    push_series(df, Series::new(name.into(), flags))
}

fn push_series(df: DataFrame, series: Series) -> Result<DataFrame> {
    let mut result = df;
    result = result
        .with_column(series)
        .map_err(|e| RetentionError::DataError(e.to_string()))?
        .clone();
    Ok(result)
}
