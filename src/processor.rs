use crate::data_structures::{RawRecord, StockRow};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("missing columns in data: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("cannot standardize features: {0}")]
    DegenerateInput(String),
}

const REQUIRED_COLUMNS: [&str; 3] = ["time", "open", "close"];

// Timestamp shapes accepted from callers and the quote provider
const TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Clean a raw batch into a time-ordered table of fully populated rows.
///
/// The batch as a whole must carry the `time`, `open` and `close` columns;
/// individual rows with a missing field or an unparseable timestamp are
/// dropped rather than failing the batch. Ties in the ascending time sort
/// keep their original input order.
pub fn clean_stock_data(batch: &[RawRecord]) -> Result<Vec<StockRow>, ProcessError> {
    info!(batch_size = batch.len(), "Starting data cleaning");

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !batch.iter().any(|record| record.has_column(column)))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Batch is missing required columns");
        return Err(ProcessError::MissingColumns(missing));
    }

    let mut rows: Vec<StockRow> = Vec::with_capacity(batch.len());
    let mut dropped = 0usize;
    for record in batch {
        let (Some(time_raw), Some(open), Some(close)) =
            (record.time.as_deref(), record.open, record.close)
        else {
            dropped += 1;
            continue;
        };
        let Some(time) = parse_time(time_raw) else {
            debug!(time = time_raw, "Dropping row with unparseable timestamp");
            dropped += 1;
            continue;
        };
        if !open.is_finite() || !close.is_finite() {
            dropped += 1;
            continue;
        }
        rows.push(StockRow {
            time,
            open,
            close,
            price_change: close - open,
        });
    }

    rows.sort_by_key(|row| row.time);

    if dropped > 0 {
        warn!(dropped, "Dropped rows with missing or invalid fields");
    }
    info!(
        batch_size = batch.len(),
        cleaned_size = rows.len(),
        "Data cleaning complete"
    );
    Ok(rows)
}

/// Standardize the `price_change` column to zero mean and unit variance,
/// one feature per cleaned row. Sample standard deviation (ddof = 1).
pub fn prepare_features(rows: &[StockRow]) -> Result<Vec<f64>, ProcessError> {
    info!(row_count = rows.len(), "Preparing features");

    if rows.len() < 2 {
        return Err(ProcessError::DegenerateInput(format!(
            "need at least 2 rows to standardize, got {}",
            rows.len()
        )));
    }

    let changes: Vec<f64> = rows.iter().map(|row| row.price_change).collect();
    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes
        .iter()
        .map(|change| (change - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev == 0.0 || !stddev.is_finite() {
        return Err(ProcessError::DegenerateInput(
            "price changes have zero variance".to_string(),
        ));
    }

    let features: Vec<f64> = changes
        .iter()
        .map(|change| (change - mean) / stddev)
        .collect();

    info!(feature_count = features.len(), "Feature preparation complete");
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> Vec<RawRecord> {
        vec![
            RawRecord::new("2025-01-11T10:00", 100.5, 102.3),
            RawRecord::new("2025-01-11T11:00", 102.3, 103.8),
            RawRecord::new("2025-01-11T12:00", 103.8, 101.2),
            RawRecord::new("2025-01-11T13:00", 101.2, 100.0),
        ]
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn clean_computes_price_change_per_row() {
        let rows = clean_stock_data(&sample_batch()).unwrap();
        assert_eq!(rows.len(), 4);
        let changes: Vec<f64> = rows.iter().map(|row| row.price_change).collect();
        for (actual, expected) in changes.iter().zip([1.8, 1.5, -2.6, -1.2]) {
            assert_close(*actual, expected);
        }
        for row in &rows {
            assert_close(row.price_change, row.close - row.open);
        }
    }

    #[test]
    fn clean_sorts_ascending_by_time() {
        let mut batch = sample_batch();
        batch.reverse();
        let rows = clean_stock_data(&batch).unwrap();
        assert!(rows.windows(2).all(|pair| pair[0].time <= pair[1].time));
        assert_close(rows[0].price_change, 1.8);
        assert_close(rows[3].price_change, -1.2);
    }

    #[test]
    fn clean_accepts_provider_and_rfc3339_timestamps() {
        let batch = vec![
            RawRecord::new("2025-01-11 15:00:00", 100.5, 101.2),
            RawRecord::new("2025-01-11T15:01:00Z", 101.2, 102.0),
            RawRecord::new("2025-01-11T15:02:00", 102.0, 101.8),
        ];
        let rows = clean_stock_data(&batch).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn clean_rejects_batch_missing_required_columns() {
        let batch = vec![RawRecord {
            time: Some("2025-01-11T10:00".to_string()),
            open: Some(100.5),
            close: None,
        }];
        let err = clean_stock_data(&batch).unwrap_err();
        match err {
            ProcessError::MissingColumns(missing) => assert_eq!(missing, vec!["close"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn clean_rejects_empty_batch_as_missing_all_columns() {
        let err = clean_stock_data(&[]).unwrap_err();
        match err {
            ProcessError::MissingColumns(missing) => {
                assert_eq!(missing, vec!["time", "open", "close"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn clean_drops_rows_with_bad_timestamps_or_missing_fields() {
        let mut batch = sample_batch();
        batch.push(RawRecord::new("not-a-timestamp", 1.0, 2.0));
        batch.push(RawRecord {
            time: Some("2025-01-11T14:00".to_string()),
            open: None,
            close: Some(100.0),
        });
        let rows = clean_stock_data(&batch).unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn features_are_row_aligned_and_centered() {
        let rows = clean_stock_data(&sample_batch()).unwrap();
        let features = prepare_features(&rows).unwrap();
        assert_eq!(features.len(), rows.len());
        let mean = features.iter().sum::<f64>() / features.len() as f64;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn zero_variance_batch_is_degenerate() {
        let batch = vec![
            RawRecord::new("2025-01-11T10:00", 100.0, 101.0),
            RawRecord::new("2025-01-11T11:00", 200.0, 201.0),
            RawRecord::new("2025-01-11T12:00", 300.0, 301.0),
        ];
        let rows = clean_stock_data(&batch).unwrap();
        let err = prepare_features(&rows).unwrap_err();
        assert!(matches!(err, ProcessError::DegenerateInput(_)));
    }

    #[test]
    fn empty_and_single_row_inputs_are_degenerate() {
        assert!(matches!(
            prepare_features(&[]),
            Err(ProcessError::DegenerateInput(_))
        ));
        let one_row = clean_stock_data(&sample_batch()[..1]).unwrap();
        assert!(matches!(
            prepare_features(&one_row),
            Err(ProcessError::DegenerateInput(_))
        ));
    }
}
