// Application layer - Use cases and business logic
pub mod dashboard_service;
pub mod location_service;
pub mod sensor_repository;
pub mod series_aggregator;
pub mod statistics_summarizer;
pub mod strategy_selector;
pub mod time_converter;
