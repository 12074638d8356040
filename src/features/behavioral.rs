//! Behavioral feature stage
//!
//! Joins per-student VLE interaction aggregates onto the feature table and
//! derives relative activity indicators. "High activity" is batch-relative:
//! thresholds are the medians of the training batch, frozen into
//! [`super::FeatureInfo`] so inference batches reuse the same cut points.

use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::debug;

use crate::data::ID_STUDENT;
use crate::error::{RetentionError, Result};

use super::FeatureEngineer;

/// (source aggregate column, derived indicator) pairs thresholded at the
/// column median.
const MEDIAN_INDICATORS: [(&str, &str); 3] = [
    ("total_clicks", "high_activity"),
    ("n_interactions", "engaged_sessions"),
    ("n_activity_types", "broad_activity"),
];

impl FeatureEngineer {
    /// Build behavioral features from interaction aggregates.
    ///
    /// Aggregates are left-joined on `id_student`; students without a match
    /// are zero-activity, not unknown, so every joined numeric column is
    /// filled with 0. When `frozen` thresholds are supplied they are used as
    /// is; otherwise medians are computed on the current batch and returned
    /// for freezing.
    pub fn build_behavioral_features(
        &self,
        df: &DataFrame,
        interactions: &DataFrame,
        frozen: Option<&BTreeMap<String, f64>>,
    ) -> Result<(DataFrame, BTreeMap<String, f64>)> {
        if interactions.column(ID_STUDENT).is_err() {
            return Err(RetentionError::MissingColumn(ID_STUDENT.to_string()));
        }

        let joined_cols: Vec<String> = interactions
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != ID_STUDENT)
            .collect();

        let mut result = df.join(
            interactions,
            [ID_STUDENT],
            [ID_STUDENT],
            JoinArgs::new(JoinType::Left),
            None,
        )?;

        // Non-interacting students have zero activity
        for name in &joined_cols {
            let col = result.column(name)?;
            if !col.dtype().is_primitive_numeric() {
                continue;
            }
            let filled = col
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .fill_null(FillNullStrategy::Zero)?;
            result = result.with_column(filled)?.clone();
        }

        let mut thresholds = BTreeMap::new();

        for (source, indicator) in MEDIAN_INDICATORS {
            let Ok(col) = result.column(source) else {
                continue;
            };
            let values = col.as_materialized_series().cast(&DataType::Float64)?;
            let ca = values
                .f64()
                .map_err(|e| RetentionError::DataError(e.to_string()))?;

            let cutoff = match frozen.and_then(|f| f.get(source)) {
                Some(v) => *v,
                None => ca.median().unwrap_or(0.0),
            };
            thresholds.insert(source.to_string(), cutoff);

            let above: Vec<i32> = ca
                .into_iter()
                .map(|v| match v {
                    Some(x) if x > cutoff => 1,
                    _ => 0,
                })
                .collect();
            result = result
                .with_column(Series::new(indicator.into(), above))?
                .clone();

            if source == "total_clicks" {
                let below: Vec<i32> = ca
                    .into_iter()
                    .map(|v| match v {
                        Some(x) if x <= cutoff => 1,
                        _ => 0,
                    })
                    .collect();
                result = result
                    .with_column(Series::new("low_activity".into(), below))?
                    .clone();
            }
        }

        if let Ok(col) = result.column("avg_clicks_per_interaction") {
            let values = col.as_materialized_series().cast(&DataType::Float64)?;
            let ca = values
                .f64()
                .map_err(|e| RetentionError::DataError(e.to_string()))?;
            let active: Vec<i32> = ca
                .into_iter()
                .map(|v| match v {
                    Some(x) if x > 0.0 => 1,
                    _ => 0,
                })
                .collect();
            result = result
                .with_column(Series::new("consistent_activity".into(), active))?
                .clone();
        }

        debug!(
            columns = result.width(),
            thresholds = thresholds.len(),
            "Behavioral features built"
        );
        Ok((result, thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn students() -> DataFrame {
        df!(ID_STUDENT => &[1i64, 2, 3, 4]).unwrap()
    }

    fn aggregates() -> DataFrame {
        df!(
            ID_STUDENT => &[1i64, 2, 3],
            "total_clicks" => &[10.0, 200.0, 50.0],
            "n_interactions" => &[2.0, 40.0, 10.0],
            "avg_clicks_per_interaction" => &[5.0, 5.0, 5.0],
            "n_activity_types" => &[1.0, 8.0, 3.0],
        )
        .unwrap()
    }

    #[test]
    fn test_unmatched_students_filled_with_zero() {
        let engineer = FeatureEngineer::new();
        let (result, _) = engineer
            .build_behavioral_features(&students(), &aggregates(), None)
            .unwrap();

        let clicks = result.column("total_clicks").unwrap().f64().unwrap();
        assert_eq!(clicks.get(3), Some(0.0));
        assert_eq!(clicks.null_count(), 0);
    }

    #[test]
    fn test_median_indicators() {
        let engineer = FeatureEngineer::new();
        let (result, thresholds) = engineer
            .build_behavioral_features(&students(), &aggregates(), None)
            .unwrap();

        // median of [10, 200, 50, 0] = 30
        assert_eq!(thresholds.get("total_clicks"), Some(&30.0));

        let high = result.column("high_activity").unwrap().i32().unwrap();
        let low = result.column("low_activity").unwrap().i32().unwrap();
        assert_eq!(high.get(0), Some(0));
        assert_eq!(high.get(1), Some(1));
        assert_eq!(high.get(2), Some(1));
        assert_eq!(high.get(3), Some(0));
        // high/low partition every row
        for i in 0..4 {
            assert_eq!(high.get(i).unwrap() + low.get(i).unwrap(), 1);
        }

        // Every aggregate column yields its named indicator
        assert!(result.column("engaged_sessions").is_ok());
        assert!(result.column("broad_activity").is_ok());
    }

    #[test]
    fn test_frozen_thresholds_override_batch_medians() {
        let engineer = FeatureEngineer::new();
        let mut frozen = BTreeMap::new();
        frozen.insert("total_clicks".to_string(), 1000.0);

        let (result, used) = engineer
            .build_behavioral_features(&students(), &aggregates(), Some(&frozen))
            .unwrap();

        assert_eq!(used.get("total_clicks"), Some(&1000.0));
        let high = result.column("high_activity").unwrap().i32().unwrap();
        // Nobody clears a frozen cutoff of 1000
        assert!(high.into_iter().all(|v| v == Some(0)));
    }

    #[test]
    fn test_consistent_activity_from_mean_clicks() {
        let engineer = FeatureEngineer::new();
        let (result, _) = engineer
            .build_behavioral_features(&students(), &aggregates(), None)
            .unwrap();

        let active = result.column("consistent_activity").unwrap().i32().unwrap();
        assert_eq!(active.get(0), Some(1));
        assert_eq!(active.get(3), Some(0)); // zero-filled join
    }
}
