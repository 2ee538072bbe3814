use std::sync::Arc;
use tracing::info;

pub type SharedModel = Arc<TrendModel>;

/// Stand-in trend model, constructed once at startup and shared read-only.
/// Until real weights exist, the label is the sign of the price change.
#[derive(Debug, Default)]
pub struct TrendModel;

impl TrendModel {
    pub fn load() -> Self {
        info!("Loading trend model (sign-of-change placeholder)");
        TrendModel
    }

    /// One label per input value: +1 for a positive change, -1 otherwise.
    pub fn predict(&self, changes: &[f64]) -> Vec<i8> {
        changes
            .iter()
            .map(|&change| if change > 0.0 { 1 } else { -1 })
            .collect()
    }
}
