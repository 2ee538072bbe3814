use crate::data_structures::{PredictRequest, RawRecord};
use crate::fetcher::{FetchError, SharedFetcher};
use crate::model::SharedModel;
use crate::processor::{self, ProcessError};
use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// Error boundary: every failure leaving a handler becomes a JSON body of
/// the shape `{"error": <message>}` with the matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ProcessError> for ApiError {
    fn from(error: ProcessError) -> Self {
        match error {
            // Missing columns are a caller fault; a degenerate batch only
            // surfaces after cleaning succeeded, so it maps to 500.
            ProcessError::MissingColumns(_) => ApiError::bad_request(error.to_string()),
            ProcessError::DegenerateInput(_) => ApiError::internal(error.to_string()),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(error: FetchError) -> Self {
        ApiError::internal(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub symbol: String,
    pub data: Vec<RawRecord>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<i8>,
}

#[instrument]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check endpoint accessed");
    (StatusCode::OK, Json(json!({ "status": "Server is running!" })))
}

#[instrument(skip(fetcher, query), fields(symbol = query.symbol.as_deref().unwrap_or("")))]
pub async fn get_stock_handler(
    State(fetcher): State<SharedFetcher>,
    Query(query): Query<StockQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let symbol = match query.symbol.as_deref().map(str::trim) {
        Some(symbol) if !symbol.is_empty() => symbol.to_owned(),
        _ => {
            warn!("Stock request without a symbol");
            return Err(ApiError::bad_request("query parameter 'symbol' is required"));
        }
    };

    let data = fetcher.fetch_intraday(&symbol).await.map_err(|error| {
        warn!(%symbol, %error, "Stock fetch failed");
        ApiError::from(error)
    })?;

    info!(%symbol, record_count = data.len(), "Fetched stock data");
    Ok((StatusCode::OK, Json(StockResponse { symbol, data })))
}

#[instrument(skip(model, body))]
pub async fn predict_handler(
    State(model): State<SharedModel>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!(%rejection, "Rejected malformed predict body");
        ApiError::bad_request(rejection.body_text())
    })?;

    let predictions = match request {
        PredictRequest::Features { features } => {
            info!(feature_count = features.len(), "Predicting over caller-prepared features");
            model.predict(&features)
        }
        PredictRequest::Batch(records) => {
            info!(batch_size = records.len(), "Predicting over raw record batch");
            let cleaned = processor::clean_stock_data(&records)?;
            let features = processor::prepare_features(&cleaned)?;
            debug!(feature_count = features.len(), "Prepared features");

            // Labels come from the pre-normalization price change
            let changes: Vec<f64> = cleaned.iter().map(|row| row.price_change).collect();
            model.predict(&changes)
        }
    };

    info!(prediction_count = predictions.len(), "Generated predictions");
    Ok((StatusCode::OK, Json(PredictResponse { predictions })))
}
