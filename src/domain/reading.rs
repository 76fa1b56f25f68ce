// Sensor reading and series domain models
use super::errors::SensorError;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// One sensor observation. Value fields are keyed by name; a field the
/// sensor did not report is simply not present in the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
    pub device_id: Option<String>,
}

impl Reading {
    pub fn new(location: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            timestamp,
            values: BTreeMap::new(),
            device_id: None,
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: f64) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SensorError> {
        if start > end {
            return Err(SensorError::InvalidTimeWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Readings for one query. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    readings: Vec<Reading>,
}

impl Series {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Distinct locations in sorted order
    pub fn locations(&self) -> BTreeSet<&str> {
        self.readings.iter().map(|r| r.location.as_str()).collect()
    }
}
