pub mod api;
pub mod config;
pub mod data_structures;
pub mod fetcher;
pub mod logging;
pub mod model;
pub mod processor;

use crate::config::FetcherMode;
use crate::fetcher::{AlphaVantageFetcher, FixtureFetcher, SharedFetcher};
use crate::model::{SharedModel, TrendModel};
use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct AppState {
    fetcher: SharedFetcher,
    model: SharedModel,
}

impl FromRef<AppState> for SharedFetcher {
    fn from_ref(app_state: &AppState) -> SharedFetcher {
        app_state.fetcher.clone()
    }
}

impl FromRef<AppState> for SharedModel {
    fn from_ref(app_state: &AppState) -> SharedModel {
        app_state.model.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = config::AppConfig::load();

    logging::init(&app_config.log_dir)?;

    tracing::info!("Starting stocktrend-service");
    tracing::info!(
        environment = %app_config.environment,
        port = app_config.port,
        fetcher = ?app_config.fetcher,
        "Loaded configuration"
    );

    let fetcher: SharedFetcher = match app_config.fetcher {
        FetcherMode::Live => Arc::new(AlphaVantageFetcher::new(&app_config)?),
        FetcherMode::Fixture => Arc::new(FixtureFetcher),
    };
    let model: SharedModel = Arc::new(TrendModel::load());

    let app_state = AppState { fetcher, model };

    let app = Router::new()
        .route("/", get(api::health_handler))
        .route("/api/stock", get(api::get_stock_handler))
        .route("/api/stock-data", get(api::get_stock_handler))
        .route("/api/predict", post(api::predict_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
