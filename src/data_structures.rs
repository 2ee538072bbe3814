use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Core Data Structures ---

/// One raw observation, as submitted by a caller or reshaped from the quote
/// provider. Fields are optional so batch-level column validation can see
/// which columns are actually present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
}

impl RawRecord {
    pub fn new(time: &str, open: f64, close: f64) -> Self {
        Self {
            time: Some(time.to_string()),
            open: Some(open),
            close: Some(close),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        match column {
            "time" => self.time.is_some(),
            "open" => self.open.is_some(),
            "close" => self.close.is_some(),
            _ => false,
        }
    }
}

/// One row of the cleaned table: time-ordered, fully populated, augmented
/// with the per-row price change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub price_change: f64,
}

// --- Request Boundary Types ---

/// Body accepted by the predict endpoint: either a raw record batch to run
/// through the cleaning pipeline, or an already-prepared feature vector.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum PredictRequest {
    Features { features: Vec<f64> },
    Batch(Vec<RawRecord>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_distinguishes_batch_from_features() {
        let batch: PredictRequest =
            serde_json::from_str(r#"[{"time": "2025-01-11T10:00", "open": 1.0, "close": 2.0}]"#)
                .unwrap();
        assert!(matches!(batch, PredictRequest::Batch(records) if records.len() == 1));

        let features: PredictRequest =
            serde_json::from_str(r#"{"features": [0.5, -0.5]}"#).unwrap();
        assert!(matches!(features, PredictRequest::Features { features } if features.len() == 2));
    }

    #[test]
    fn raw_record_reports_missing_columns() {
        let record: RawRecord = serde_json::from_str(r#"{"open": 1.0, "close": 2.0}"#).unwrap();
        assert!(!record.has_column("time"));
        assert!(record.has_column("open"));
        assert!(record.has_column("close"));
    }
}
