// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::location_service::LocationService;
use crate::application::series_aggregator::SeriesAggregator;
use crate::application::statistics_summarizer::StatisticsSummarizer;
use crate::infrastructure::config::load_config;
use crate::infrastructure::query_cache::QueryCache;
use crate::infrastructure::sqlite_repository::SqliteRepository;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_config()?;
    let converter = config.time_converter()?;
    let comfort = config.comfort_settings()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(SqliteRepository::open(&config.database.path)?);
    let cache = Arc::new(QueryCache::new(config.cache_ttl(), config.cache.max_entries));

    // Create services (application layer)
    let location_service = LocationService::new(repository.clone());
    let dashboard_service = DashboardService::new(
        repository,
        SeriesAggregator::new(converter),
        StatisticsSummarizer::new(comfort, config.battery.percentage_field.clone()),
        cache,
    );

    // Create application state
    let state = Arc::new(AppState {
        location_service,
        dashboard_service,
        converter,
    });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(
        "Starting sensor-dashboard on {} (timezone {})",
        addr,
        converter.timezone().name()
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
