// Mapper to convert domain models to JSON response bodies
use crate::application::time_converter::TimezoneInfo;
use crate::domain::aggregation::{AggregationResult, Bucket};
use crate::domain::statistics::{
    BatteryHealth, FieldStatistics, LocationStatistics, Statistics, Trend,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub strategy: String,
    pub summary: SummaryDto,
    pub buckets: Vec<BucketDto>,
}

#[derive(Debug, Serialize)]
pub struct SummaryDto {
    pub original_count: usize,
    pub aggregated_count: usize,
    pub reduction_ratio: f64,
    pub span_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct BucketDto {
    pub location: String,
    /// Local wall-clock start with its UTC offset
    pub start: String,
    pub time_ms: i64,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub locations: BTreeMap<String, LocationStatisticsDto>,
}

#[derive(Debug, Serialize)]
pub struct LocationStatisticsDto {
    pub fields: BTreeMap<String, FieldStatisticsDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comfort: Option<ComfortDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryDto>,
}

#[derive(Debug, Serialize)]
pub struct FieldStatisticsDto {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub latest_value: Option<f64>,
    pub latest_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDto>,
}

#[derive(Debug, Serialize)]
pub struct TrendDto {
    pub slope_per_hour: f64,
    pub correlation: f64,
    pub direction: &'static str,
    pub strength: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ComfortDto {
    pub score: f64,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BatteryDto {
    pub critical_percentage: f64,
    pub low_percentage: f64,
    pub medium_percentage: f64,
    pub good_percentage: f64,
    pub average_level: f64,
    pub lowest_level: f64,
}

#[derive(Debug, Serialize)]
pub struct TimezoneResponse {
    pub timezone: String,
    pub current_utc: String,
    pub current_local: String,
    pub is_dst: bool,
    pub utc_offset_hours: f64,
    pub dst_offset_hours: f64,
}

pub fn series_to_json(result: AggregationResult) -> SeriesResponse {
    let summary = result.summary();
    SeriesResponse {
        strategy: result.strategy.to_string(),
        summary: SummaryDto {
            original_count: summary.original_count,
            aggregated_count: summary.aggregated_count,
            reduction_ratio: summary.reduction_ratio,
            span_hours: summary.span_hours,
        },
        buckets: result.buckets.into_iter().map(bucket_to_json).collect(),
    }
}

fn bucket_to_json(bucket: Bucket) -> BucketDto {
    BucketDto {
        time_ms: bucket.start_utc().timestamp_millis(),
        start: bucket.start_local.to_rfc3339(),
        location: bucket.location,
        count: bucket.count,
        device_id: bucket.device_id,
        values: bucket.values,
    }
}

pub fn statistics_to_json(statistics: Statistics) -> StatisticsResponse {
    StatisticsResponse {
        locations: statistics
            .locations
            .into_iter()
            .map(|(location, stats)| (location, location_to_json(stats)))
            .collect(),
    }
}

fn location_to_json(stats: LocationStatistics) -> LocationStatisticsDto {
    LocationStatisticsDto {
        fields: stats
            .fields
            .into_iter()
            .map(|(field, f)| (field, field_to_json(f)))
            .collect(),
        comfort: stats.comfort.map(|c| ComfortDto {
            score: c.score,
            label: c.label.as_str(),
        }),
        battery: stats.battery.map(battery_to_json),
    }
}

fn field_to_json(stats: FieldStatistics) -> FieldStatisticsDto {
    FieldStatisticsDto {
        count: stats.count,
        min: stats.min,
        max: stats.max,
        mean: stats.mean,
        median: stats.median,
        std_dev: stats.std_dev,
        latest_value: stats.latest_value,
        latest_timestamp: stats.latest_timestamp.map(|t| t.to_rfc3339()),
        trend: stats.trend.map(trend_to_json),
    }
}

fn trend_to_json(trend: Trend) -> TrendDto {
    TrendDto {
        slope_per_hour: trend.slope_per_hour,
        correlation: trend.correlation,
        direction: trend.direction.as_str(),
        strength: trend.strength.as_str(),
    }
}

fn battery_to_json(battery: BatteryHealth) -> BatteryDto {
    BatteryDto {
        critical_percentage: battery.critical_percentage,
        low_percentage: battery.low_percentage,
        medium_percentage: battery.medium_percentage,
        good_percentage: battery.good_percentage,
        average_level: battery.average_level,
        lowest_level: battery.lowest_level,
    }
}

pub fn timezone_to_json(info: TimezoneInfo) -> TimezoneResponse {
    TimezoneResponse {
        timezone: info.timezone,
        current_utc: info.current_utc.to_rfc3339(),
        current_local: info.current_local.to_rfc3339(),
        is_dst: info.is_dst,
        utc_offset_hours: info.utc_offset_hours,
        dst_offset_hours: info.dst_offset_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::time_converter::TimeConverter;
    use crate::domain::aggregation::Strategy;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_bucket_carries_local_start_and_epoch() {
        let converter = TimeConverter::default();
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        let bucket = Bucket {
            location: "wine".to_string(),
            start_local: converter.to_local(start),
            values: BTreeMap::from([
                ("temperature".to_string(), Some(12.5)),
                ("humidity".to_string(), None),
            ]),
            count: 4,
            device_id: None,
        };

        let response = series_to_json(AggregationResult::new(Strategy::Hourly, vec![bucket], 4));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["strategy"], "hourly");
        assert_eq!(json["summary"]["reduction_ratio"], 4.0);
        let bucket = &json["buckets"][0];
        assert_eq!(bucket["start"], "2024-01-16T00:00:00+13:00");
        assert_eq!(bucket["time_ms"], start.timestamp_millis());
        assert_eq!(bucket["values"]["humidity"], serde_json::Value::Null);
        assert!(bucket.get("device_id").is_none());
    }
}
