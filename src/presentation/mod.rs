// Presentation layer - HTTP routes and handlers
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    aggregated_series, health_check, list_locations, series_statistics, timezone_info,
};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/locations", get(list_locations))
        .route("/timezone", get(timezone_info))
        .route("/tables/:table/series", get(aggregated_series))
        .route("/tables/:table/statistics", get(series_statistics))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
