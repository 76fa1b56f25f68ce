// HTTP request handlers
use crate::application::dashboard_service::SeriesQuery;
use crate::application::time_converter::TimeConverter;
use crate::domain::errors::SensorError;
use crate::domain::reading::TimeWindow;
use crate::domain::sensor::SensorTable;
use crate::infrastructure::http_response::{ApiError, json_response};
use crate::infrastructure::json_mapper::{series_to_json, statistics_to_json, timezone_to_json};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct SeriesParams {
    pub start: Option<String>,
    pub end: Option<String>,
    /// Comma separated; empty means every location
    pub locations: Option<String>,
    pub strategy: Option<String>,
    pub width_minutes: Option<i64>,
}

impl SeriesParams {
    /// Window defaults to the current local day up to now
    fn into_query(
        self,
        table: SensorTable,
        converter: &TimeConverter,
        now: DateTime<Utc>,
    ) -> Result<SeriesQuery, ApiError> {
        let end = match self.end.as_deref() {
            Some(text) => TimeConverter::parse_utc(text)?,
            None => now,
        };
        let start = match self.start.as_deref() {
            Some(text) => TimeConverter::parse_utc(text)?,
            None => converter
                .start_of_day(converter.to_local(end).date_naive())
                .with_timezone(&Utc),
        };

        let locations = self
            .locations
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let strategy = self
            .strategy
            .filter(|s| !s.trim().is_empty() && !s.trim().eq_ignore_ascii_case("auto"));

        let bucket_width = self
            .width_minutes
            .map(|minutes| {
                Duration::try_minutes(minutes)
                    .ok_or(SensorError::InvalidBucketWidth(minutes.saturating_mul(60_000)))
            })
            .transpose()?;

        Ok(SeriesQuery {
            table,
            window: TimeWindow::new(start, end)?,
            locations,
            strategy,
            bucket_width,
        })
    }
}

fn table_not_found(slug: &str) -> Response {
    tracing::debug!("Unknown sensor table {}", slug);
    (StatusCode::NOT_FOUND, format!("unknown sensor table: {}", slug)).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all sensor locations
pub async fn list_locations(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let locations = state.location_service.list_locations().await?;
    Ok(json_response(locations))
}

/// Current state of the configured timezone
pub async fn timezone_info(State(state): State<Arc<AppState>>) -> Response {
    json_response(timezone_to_json(state.converter.timezone_info(Utc::now())))
}

/// Aggregated buckets for one sensor table
pub async fn aggregated_series(
    Path(table): Path<String>,
    Query(params): Query<SeriesParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let Some(sensor_table) = SensorTable::from_slug(&table) else {
        return Ok(table_not_found(&table));
    };
    let query = params.into_query(sensor_table, &state.converter, Utc::now())?;
    let result = state.dashboard_service.aggregated_series(&query).await?;
    Ok(json_response(series_to_json(result)))
}

/// Per-location statistics over the aggregated series
pub async fn series_statistics(
    Path(table): Path<String>,
    Query(params): Query<SeriesParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let Some(sensor_table) = SensorTable::from_slug(&table) else {
        return Ok(table_not_found(&table));
    };
    let query = params.into_query(sensor_table, &state.converter, Utc::now())?;
    let statistics = state.dashboard_service.statistics(&query).await?;
    Ok(json_response(statistics_to_json(statistics)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        // 2024-01-16 10:30 in Auckland (NZDT)
        Utc.with_ymd_and_hms(2024, 1, 15, 21, 30, 0).unwrap()
    }

    #[test]
    fn test_default_window_is_local_today() {
        let query = SeriesParams::default()
            .into_query(SensorTable::TempHumidity, &TimeConverter::default(), now())
            .unwrap();

        assert_eq!(query.window.start, Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap());
        assert_eq!(query.window.end, now());
        assert!(query.locations.is_empty());
        assert_eq!(query.strategy, None);
    }

    #[test]
    fn test_explicit_parameters() {
        let params = SeriesParams {
            start: Some("2024-01-01T00:00:00Z".to_string()),
            end: Some("2024-01-02T00:00:00+13:00".to_string()),
            locations: Some("wine, office,,".to_string()),
            strategy: Some("AUTO".to_string()),
            width_minutes: Some(30),
        };
        let query = params
            .into_query(SensorTable::Battery, &TimeConverter::default(), now())
            .unwrap();

        assert_eq!(query.locations, vec!["wine", "office"]);
        assert_eq!(query.strategy, None);
        assert_eq!(query.bucket_width, Some(Duration::minutes(30)));
        assert_eq!(query.window.span(), Duration::hours(11));
    }

    #[test]
    fn test_naive_timestamp_is_rejected() {
        let params = SeriesParams {
            start: Some("2024-01-01 00:00:00".to_string()),
            ..Default::default()
        };
        let err = params
            .into_query(SensorTable::TempHumidity, &TimeConverter::default(), now())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_overflowing_width_is_rejected() {
        let params = SeriesParams {
            start: Some("2024-01-01T00:00:00Z".to_string()),
            end: Some("2024-01-02T00:00:00Z".to_string()),
            width_minutes: Some(i64::MAX),
            ..Default::default()
        };
        let err = params
            .into_query(SensorTable::TempHumidity, &TimeConverter::default(), now())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        let params = SeriesParams {
            start: Some("2024-01-03T00:00:00Z".to_string()),
            end: Some("2024-01-02T00:00:00Z".to_string()),
            ..Default::default()
        };
        let err = params
            .into_query(SensorTable::TempHumidity, &TimeConverter::default(), now())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
