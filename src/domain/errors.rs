// Errors raised by the aggregation core
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("invalid timestamp '{0}': expected an RFC 3339 instant with an explicit offset")]
    InvalidTimestamp(String),

    #[error("local time {local} does not exist in {timezone}")]
    NonexistentLocalTime {
        local: NaiveDateTime,
        timezone: String,
    },

    #[error("unknown aggregation strategy '{0}'")]
    UnknownStrategy(String),

    #[error("interpolation bucket width must be positive and at most a few centuries, got {0} ms")]
    InvalidBucketWidth(i64),

    #[error("aggregation would produce {buckets} buckets for one location, the limit is {limit}")]
    TooManyBuckets { buckets: i64, limit: i64 },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("comfort range for '{field}' needs a positive half range, got {half_range}")]
    InvalidComfortRange { field: String, half_range: f64 },

    #[error("time window start {start} is after end {end}")]
    InvalidTimeWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SensorError {
    /// Stable machine-readable name, used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTimestamp(_) => "InvalidTimestamp",
            Self::NonexistentLocalTime { .. } => "NonexistentLocalTime",
            Self::UnknownStrategy(_) => "UnknownStrategy",
            Self::InvalidBucketWidth(_) => "InvalidBucketWidth",
            Self::TooManyBuckets { .. } => "TooManyBuckets",
            Self::UnknownTimezone(_) => "UnknownTimezone",
            Self::InvalidComfortRange { .. } => "InvalidComfortRange",
            Self::InvalidTimeWindow { .. } => "InvalidTimeWindow",
        }
    }
}
