// Statistics summarizer - Descriptive statistics, trends and comfort index per location
use crate::domain::aggregation::AggregationResult;
use crate::domain::reading::Series;
use crate::domain::statistics::{
    BatteryHealth, ComfortIndex, ComfortSettings, FieldStatistics, LocationStatistics, Statistics,
    Trend, TrendDirection, TrendStrength,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const STABLE_SLOPE: f64 = 1e-10;
const BATTERY_CRITICAL: f64 = 20.0;
const BATTERY_LOW: f64 = 40.0;
const BATTERY_GOOD: f64 = 70.0;

/// One row of input, from either raw readings or aggregated buckets
#[derive(Debug, Clone)]
pub struct Observation<'a> {
    pub location: &'a str,
    pub timestamp: DateTime<Utc>,
    pub values: Vec<(&'a str, Option<f64>)>,
}

pub trait Observations {
    fn observations(&self) -> Vec<Observation<'_>>;
}

impl Observations for Series {
    fn observations(&self) -> Vec<Observation<'_>> {
        self.readings()
            .iter()
            .map(|r| Observation {
                location: &r.location,
                timestamp: r.timestamp,
                values: r.values.iter().map(|(k, v)| (k.as_str(), Some(*v))).collect(),
            })
            .collect()
    }
}

impl Observations for AggregationResult {
    fn observations(&self) -> Vec<Observation<'_>> {
        self.buckets
            .iter()
            .map(|b| Observation {
                location: &b.location,
                timestamp: b.start_utc(),
                values: b.values.keys().map(|k| (k.as_str(), b.value(k))).collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsSummarizer {
    comfort: ComfortSettings,
    battery_field: Option<String>,
}

impl StatisticsSummarizer {
    pub fn new(comfort: ComfortSettings, battery_field: Option<String>) -> Self {
        Self {
            comfort,
            battery_field,
        }
    }

    pub fn summarize<S: Observations + ?Sized>(&self, source: &S) -> Statistics {
        // location -> field -> samples in input order
        let mut grouped: BTreeMap<&str, BTreeMap<&str, Vec<(DateTime<Utc>, Option<f64>)>>> =
            BTreeMap::new();
        let observations = source.observations();
        for observation in &observations {
            let fields = grouped.entry(observation.location).or_default();
            for (field, value) in &observation.values {
                fields
                    .entry(*field)
                    .or_default()
                    .push((observation.timestamp, *value));
            }
        }

        let locations = grouped
            .into_iter()
            .map(|(location, fields)| {
                let battery = self
                    .battery_field
                    .as_deref()
                    .and_then(|name| fields.get(name))
                    .and_then(|samples| battery_health(samples));
                let fields: BTreeMap<String, FieldStatistics> = fields
                    .into_iter()
                    .map(|(field, samples)| (field.to_string(), field_statistics(&samples)))
                    .collect();
                let comfort = self.comfort_index(&fields);
                (
                    location.to_string(),
                    LocationStatistics {
                        fields,
                        comfort,
                        battery,
                    },
                )
            })
            .collect();

        Statistics { locations }
    }

    /// Average of the temperature and humidity component scores, computed
    /// from each field's mean. Omitted unless both fields have data.
    fn comfort_index(&self, fields: &BTreeMap<String, FieldStatistics>) -> Option<ComfortIndex> {
        let temperature = fields.get(&self.comfort.temperature.field)?.mean?;
        let humidity = fields.get(&self.comfort.humidity.field)?.mean?;
        let score = (self.comfort.temperature.component_score(temperature)
            + self.comfort.humidity.component_score(humidity))
            / 2.0;
        Some(ComfortIndex::from_score(score))
    }
}

fn field_statistics(samples: &[(DateTime<Utc>, Option<f64>)]) -> FieldStatistics {
    let present: Vec<(DateTime<Utc>, f64)> = samples
        .iter()
        .filter_map(|(at, value)| value.map(|v| (*at, v)))
        .collect();
    if present.is_empty() {
        return FieldStatistics::default();
    }

    let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let std_dev = (count > 1).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    });

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    // Later input wins a timestamp tie
    let mut latest = present[0];
    for sample in &present[1..] {
        if sample.0 >= latest.0 {
            latest = *sample;
        }
    }

    FieldStatistics {
        count,
        min: Some(min),
        max: Some(max),
        mean: Some(mean),
        median: Some(median),
        std_dev,
        latest_value: Some(latest.1),
        latest_timestamp: Some(latest.0),
        trend: trend(&present),
    }
}

/// Least-squares fit of value against hours elapsed
fn trend(present: &[(DateTime<Utc>, f64)]) -> Option<Trend> {
    if present.len() < 2 {
        return None;
    }
    let mut points = present.to_vec();
    points.sort_by_key(|(at, _)| *at);
    let origin = points[0].0;
    let xs: Vec<f64> = points
        .iter()
        .map(|(at, _)| (*at - origin).num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    let ys: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        sxx += (x - mean_x).powi(2);
        syy += (y - mean_y).powi(2);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let correlation = if syy == 0.0 { 0.0 } else { sxy / (sxx * syy).sqrt() };
    let direction = if slope.abs() < STABLE_SLOPE {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };
    let strength = if correlation.abs() > 0.7 {
        TrendStrength::Strong
    } else if correlation.abs() > 0.4 {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    };

    Some(Trend {
        slope_per_hour: slope,
        correlation,
        direction,
        strength,
        points: points.len(),
        span_hours: xs.last().copied().unwrap_or(0.0),
    })
}

fn battery_health(samples: &[(DateTime<Utc>, Option<f64>)]) -> Option<BatteryHealth> {
    let levels: Vec<f64> = samples.iter().filter_map(|(_, v)| *v).collect();
    if levels.is_empty() {
        return None;
    }
    let total = levels.len() as f64;
    let share = |predicate: &dyn Fn(f64) -> bool| {
        levels.iter().filter(|v| predicate(**v)).count() as f64 / total * 100.0
    };

    Some(BatteryHealth {
        critical_percentage: share(&|v: f64| v < BATTERY_CRITICAL),
        low_percentage: share(&|v: f64| (BATTERY_CRITICAL..BATTERY_LOW).contains(&v)),
        medium_percentage: share(&|v: f64| (BATTERY_LOW..BATTERY_GOOD).contains(&v)),
        good_percentage: share(&|v: f64| v >= BATTERY_GOOD),
        average_level: levels.iter().sum::<f64>() / total,
        lowest_level: levels.iter().cloned().fold(f64::INFINITY, f64::min),
    })
}
