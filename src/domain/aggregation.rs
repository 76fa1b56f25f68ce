// Aggregation domain models
use super::errors::SensorError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Raw,
    Hourly,
    Daily,
    Weekly,
    Interpolate,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Self::Raw,
        Self::Hourly,
        Self::Daily,
        Self::Weekly,
        Self::Interpolate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Interpolate => "interpolate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "interpolate" | "interpolation" => Ok(Self::Interpolate),
            _ => Err(SensorError::UnknownStrategy(s.to_string())),
        }
    }
}

/// One slot on the result grid. `count` is the number of raw readings folded
/// in; a value of `None` means the slot had no data for that field.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub location: String,
    pub start_local: DateTime<Tz>,
    pub values: BTreeMap<String, Option<f64>>,
    pub count: usize,
    pub device_id: Option<String>,
}

impl Bucket {
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start_local.with_timezone(&Utc)
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub strategy: Strategy,
    pub buckets: Vec<Bucket>,
    pub source_count: usize,
}

impl AggregationResult {
    pub fn new(strategy: Strategy, buckets: Vec<Bucket>, source_count: usize) -> Self {
        Self {
            strategy,
            buckets,
            source_count,
        }
    }

    pub fn empty(strategy: Strategy) -> Self {
        Self::new(strategy, Vec::new(), 0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn summary(&self) -> AggregationSummary {
        let span_hours = match (self.buckets.first(), self.buckets.last()) {
            (Some(first), Some(last)) => {
                (last.start_utc() - first.start_utc()).num_seconds() as f64 / 3600.0
            }
            _ => 0.0,
        };
        let reduction_ratio = if self.is_empty() {
            0.0
        } else {
            self.source_count as f64 / self.len() as f64
        };

        AggregationSummary {
            original_count: self.source_count,
            aggregated_count: self.len(),
            reduction_ratio,
            strategy: self.strategy,
            span_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSummary {
    pub original_count: usize,
    pub aggregated_count: usize,
    pub reduction_ratio: f64,
    pub strategy: Strategy,
    pub span_hours: f64,
}
