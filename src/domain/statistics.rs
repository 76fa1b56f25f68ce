// Statistics domain models
use super::errors::SensorError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub locations: BTreeMap<String, LocationStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationStatistics {
    pub fields: BTreeMap<String, FieldStatistics>,
    pub comfort: Option<ComfortIndex>,
    pub battery: Option<BatteryHealth>,
}

/// Summary of one field at one location. Every value is computed over
/// non-null samples only, so `None` means "no data", never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStatistics {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub latest_value: Option<f64>,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub slope_per_hour: f64,
    pub correlation: f64,
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    pub points: usize,
    pub span_hours: f64,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl TrendStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComfortLabel {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl ComfortLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            Self::Excellent
        } else if score >= 0.5 {
            Self::Good
        } else if score >= 0.25 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComfortIndex {
    pub score: f64,
    pub label: ComfortLabel,
}

impl ComfortIndex {
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            label: ComfortLabel::from_score(score),
        }
    }
}

/// Ideal band for one comfort component
#[derive(Debug, Clone, PartialEq)]
pub struct ComfortRange {
    pub field: String,
    pub ideal_midpoint: f64,
    pub half_range: f64,
}

impl ComfortRange {
    pub fn new(
        field: impl Into<String>,
        ideal_midpoint: f64,
        half_range: f64,
    ) -> Result<Self, SensorError> {
        let field = field.into();
        if !half_range.is_finite() || half_range <= 0.0 {
            return Err(SensorError::InvalidComfortRange { field, half_range });
        }
        Ok(Self {
            field,
            ideal_midpoint,
            half_range,
        })
    }

    /// 1.0 at the midpoint, falling linearly to 0.0 at midpoint ± half range
    pub fn component_score(&self, value: f64) -> f64 {
        (1.0 - (value - self.ideal_midpoint).abs() / self.half_range).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComfortSettings {
    pub temperature: ComfortRange,
    pub humidity: ComfortRange,
}

impl Default for ComfortSettings {
    // 18-26 °C and 30-70 %RH
    fn default() -> Self {
        Self {
            temperature: ComfortRange {
                field: "temperature".to_string(),
                ideal_midpoint: 22.0,
                half_range: 4.0,
            },
            humidity: ComfortRange {
                field: "humidity".to_string(),
                ideal_midpoint: 50.0,
                half_range: 20.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryHealth {
    pub critical_percentage: f64,
    pub low_percentage: f64,
    pub medium_percentage: f64,
    pub good_percentage: f64,
    pub average_level: f64,
    pub lowest_level: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comfort_label_thresholds() {
        assert_eq!(ComfortLabel::from_score(1.0), ComfortLabel::Excellent);
        assert_eq!(ComfortLabel::from_score(0.75), ComfortLabel::Excellent);
        assert_eq!(ComfortLabel::from_score(0.6), ComfortLabel::Good);
        assert_eq!(ComfortLabel::from_score(0.25), ComfortLabel::Fair);
        assert_eq!(ComfortLabel::from_score(0.0), ComfortLabel::Poor);
        assert!(ComfortLabel::Excellent > ComfortLabel::Poor);
    }

    #[test]
    fn test_component_score() {
        let range = ComfortRange::new("temperature", 22.0, 4.0).unwrap();
        assert_eq!(range.component_score(22.0), 1.0);
        assert_eq!(range.component_score(26.0), 0.0);
        assert_eq!(range.component_score(18.0), 0.0);
        assert_eq!(range.component_score(35.0), 0.0);
        assert_eq!(range.component_score(24.0), 0.5);
    }

    #[test]
    fn test_comfort_range_rejects_non_positive_half_range() {
        assert!(ComfortRange::new("humidity", 50.0, 0.0).is_err());
        assert!(ComfortRange::new("humidity", 50.0, -5.0).is_err());
        assert!(ComfortRange::new("humidity", 50.0, f64::NAN).is_err());
    }
}
