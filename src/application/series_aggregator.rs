// Series aggregation - Resamples readings onto a regular grid per location
use crate::application::time_converter::TimeConverter;
use crate::domain::aggregation::{AggregationResult, Bucket, Strategy};
use crate::domain::errors::SensorError;
use crate::domain::reading::{Reading, Series};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_INTERPOLATION_MINUTES: i64 = 15;
pub const MAX_BUCKETS_PER_LOCATION: i64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalendarUnit {
    Hour,
    Day,
    Week,
}

impl CalendarUnit {
    fn nominal_hours(self) -> i64 {
        match self {
            Self::Hour => 1,
            Self::Day => 24,
            Self::Week => 168,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Plan {
    Passthrough,
    Calendar(CalendarUnit),
    Grid(Duration),
}

/// Running sums for one bucket
#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sums: BTreeMap<String, (f64, usize)>,
    device_id: Option<String>,
}

impl Accumulator {
    fn add(&mut self, reading: &Reading) {
        self.count += 1;
        for (field, value) in &reading.values {
            let slot = self.sums.entry(field.clone()).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }
        if self.device_id.is_none() {
            self.device_id = reading.device_id.clone();
        }
    }

    fn mean(&self, field: &str) -> Option<f64> {
        self.sums
            .get(field)
            .filter(|(_, n)| *n > 0)
            .map(|(sum, n)| sum / *n as f64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesAggregator {
    converter: TimeConverter,
}

impl SeriesAggregator {
    pub fn new(converter: TimeConverter) -> Self {
        Self { converter }
    }

    /// Resample `series` with `strategy`. `bucket_width` only applies to
    /// `Interpolate` (default 15 minutes). Each location is aggregated on its
    /// own grid; the result lists locations in sorted order.
    pub fn aggregate(
        &self,
        series: &Series,
        strategy: Strategy,
        bucket_width: Option<Duration>,
    ) -> Result<AggregationResult, SensorError> {
        let plan = match strategy {
            Strategy::Raw => Plan::Passthrough,
            Strategy::Hourly => Plan::Calendar(CalendarUnit::Hour),
            Strategy::Daily => Plan::Calendar(CalendarUnit::Day),
            Strategy::Weekly => Plan::Calendar(CalendarUnit::Week),
            Strategy::Interpolate => {
                let width = bucket_width
                    .unwrap_or_else(|| Duration::minutes(DEFAULT_INTERPOLATION_MINUTES));
                if width.num_milliseconds() <= 0 {
                    return Err(SensorError::InvalidBucketWidth(width.num_milliseconds()));
                }
                Plan::Grid(width)
            }
        };
        if series.is_empty() {
            return Ok(AggregationResult::empty(strategy));
        }

        let mut buckets = Vec::new();
        for location in series.locations() {
            let mut readings: Vec<&Reading> = series
                .readings()
                .iter()
                .filter(|r| r.location == location)
                .collect();
            // Stable, so readings sharing a timestamp keep input order
            readings.sort_by_key(|r| r.timestamp);
            let fields: BTreeSet<&str> = readings
                .iter()
                .flat_map(|r| r.values.keys().map(String::as_str))
                .collect();

            let location_buckets = match plan {
                Plan::Passthrough => self.passthrough(location, &readings, &fields),
                Plan::Calendar(unit) => self.calendar_buckets(location, &readings, &fields, unit)?,
                Plan::Grid(width) => self.interpolated_buckets(location, &readings, &fields, width)?,
            };
            buckets.extend(location_buckets);
        }

        Ok(AggregationResult::new(strategy, buckets, series.len()))
    }

    fn passthrough(&self, location: &str, readings: &[&Reading], fields: &BTreeSet<&str>) -> Vec<Bucket> {
        self.converter
            .attach_local(readings.iter().copied())
            .into_iter()
            .map(|localized| Bucket {
                location: location.to_string(),
                start_local: localized.local,
                values: fields
                    .iter()
                    .map(|field| (field.to_string(), localized.reading.value(field)))
                    .collect(),
                count: 1,
                device_id: localized.reading.device_id.clone(),
            })
            .collect()
    }

    fn calendar_buckets(
        &self,
        location: &str,
        readings: &[&Reading],
        fields: &BTreeSet<&str>,
        unit: CalendarUnit,
    ) -> Result<Vec<Bucket>, SensorError> {
        let (Some(first), Some(last)) = (readings.first(), readings.last()) else {
            return Ok(Vec::new());
        };

        let origin = self.unit_start(first.timestamp, unit);
        let end = self.unit_start(last.timestamp, unit);
        check_bucket_limit((end - origin).num_hours() / unit.nominal_hours() + 1)?;

        let mut starts = vec![origin];
        let mut current = origin;
        while current < end {
            current = self.next_unit_start(current, unit);
            starts.push(current);
        }

        let mut slots: Vec<Accumulator> = starts.iter().map(|_| Accumulator::default()).collect();
        for reading in readings {
            let key = self.unit_start(reading.timestamp, unit);
            if let Some(slot) = starts.binary_search(&key).ok().and_then(|i| slots.get_mut(i)) {
                slot.add(reading);
            }
        }

        Ok(starts
            .into_iter()
            .zip(slots)
            .map(|(start, slot)| Bucket {
                location: location.to_string(),
                start_local: self.converter.to_local(start),
                values: fields
                    .iter()
                    .map(|field| (field.to_string(), slot.mean(field)))
                    .collect(),
                count: slot.count,
                device_id: slot.device_id,
            })
            .collect())
    }

    fn interpolated_buckets(
        &self,
        location: &str,
        readings: &[&Reading],
        fields: &BTreeSet<&str>,
        width: Duration,
    ) -> Result<Vec<Bucket>, SensorError> {
        let (Some(first), Some(last)) = (readings.first(), readings.last()) else {
            return Ok(Vec::new());
        };

        let width_ms = width.num_milliseconds();
        let first_ms = first.timestamp.timestamp_millis();
        let origin_ms = first_ms.div_euclid(width_ms) * width_ms;
        let origin = first.timestamp - Duration::milliseconds(first_ms - origin_ms);
        let slots = (last.timestamp.timestamp_millis() - origin_ms) / width_ms + 1;
        check_bucket_limit(slots)?;

        let points: BTreeMap<&str, Vec<(i64, f64)>> = fields
            .iter()
            .map(|field| (*field, field_points(readings, field)))
            .collect();

        let mut cursor = 0;
        let mut buckets = Vec::with_capacity(slots as usize);
        for i in 0..slots {
            let start = origin + Duration::milliseconds(i * width_ms);
            let start_ms = origin_ms + i * width_ms;

            let mut count = 0;
            let mut device_id = None;
            while let Some(reading) = readings.get(cursor) {
                if reading.timestamp.timestamp_millis() >= start_ms + width_ms {
                    break;
                }
                count += 1;
                if device_id.is_none() {
                    device_id = reading.device_id.clone();
                }
                cursor += 1;
            }

            buckets.push(Bucket {
                location: location.to_string(),
                start_local: self.converter.to_local(start),
                values: points
                    .iter()
                    .map(|(field, points)| (field.to_string(), interpolate_at(points, start_ms)))
                    .collect(),
                count,
                device_id,
            });
        }
        Ok(buckets)
    }

    /// Start of the bucket containing `instant`
    fn unit_start(&self, instant: DateTime<Utc>, unit: CalendarUnit) -> DateTime<Utc> {
        match unit {
            CalendarUnit::Hour => self.hour_start(instant),
            CalendarUnit::Day | CalendarUnit::Week => self
                .converter
                .start_of_day(self.calendar_date(instant, unit))
                .with_timezone(&Utc),
        }
    }

    fn next_unit_start(&self, start: DateTime<Utc>, unit: CalendarUnit) -> DateTime<Utc> {
        match unit {
            CalendarUnit::Hour => self.next_hour_start(start),
            CalendarUnit::Day | CalendarUnit::Week => {
                let days = if unit == CalendarUnit::Day { 1 } else { 7 };
                let next = self.calendar_date(start, unit) + Duration::days(days);
                self.converter.start_of_day(next).with_timezone(&Utc)
            }
        }
    }

    /// Start of the local clock hour containing `instant`. When an offset
    /// change that is not a whole hour lands inside that hour, the bucket
    /// starts at the transition instead.
    fn hour_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let local = self.converter.to_local(instant);
        let offset = local.offset().fix();
        let candidate = instant
            - Duration::minutes(local.minute() as i64)
            - Duration::seconds(local.second() as i64)
            - Duration::nanoseconds(local.nanosecond() as i64);
        if self.offset_at(candidate) == offset {
            return candidate;
        }

        // Transitions fall on whole seconds: first second already on `offset`
        let (mut lo, mut hi) = (0, (instant - candidate).num_seconds());
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.offset_at(candidate + Duration::seconds(mid)) == offset {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        candidate + Duration::seconds(hi)
    }

    /// Hours last at most 60 minutes and offsets move in quarter hours
    fn next_hour_start(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        for quarter in 1..=4 {
            let next = self.hour_start(start + Duration::minutes(15 * quarter));
            if next > start {
                return next;
            }
        }
        start + Duration::hours(1)
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        self.converter.to_local(instant).offset().fix()
    }

    /// Local date of the day (or the Monday of the week) containing `instant`
    fn calendar_date(&self, instant: DateTime<Utc>, unit: CalendarUnit) -> NaiveDate {
        let date = self.converter.to_local(instant).date_naive();
        match unit {
            CalendarUnit::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            _ => date,
        }
    }
}

fn check_bucket_limit(buckets: i64) -> Result<(), SensorError> {
    if buckets > MAX_BUCKETS_PER_LOCATION {
        return Err(SensorError::TooManyBuckets {
            buckets,
            limit: MAX_BUCKETS_PER_LOCATION,
        });
    }
    Ok(())
}

/// Time-ordered (millis, value) points for one field. Points sharing an
/// instant are averaged.
fn field_points(readings: &[&Reading], field: &str) -> Vec<(i64, f64)> {
    let mut points: Vec<(i64, f64, usize)> = Vec::new();
    for reading in readings {
        let Some(value) = reading.value(field) else {
            continue;
        };
        let at = reading.timestamp.timestamp_millis();
        match points.last_mut() {
            Some(last) if last.0 == at => {
                last.1 += value;
                last.2 += 1;
            }
            _ => points.push((at, value, 1)),
        }
    }
    points
        .into_iter()
        .map(|(at, sum, n)| (at, sum / n as f64))
        .collect()
}

/// Linear interpolation between the two raw points bracketing `at`; the
/// boundary value is carried flat outside the raw range.
fn interpolate_at(points: &[(i64, f64)], at: i64) -> Option<f64> {
    let (first, last) = (points.first()?, points.last()?);
    if at <= first.0 {
        return Some(first.1);
    }
    if at >= last.0 {
        return Some(last.1);
    }

    match points.binary_search_by_key(&at, |p| p.0) {
        Ok(i) => Some(points[i].1),
        Err(i) => {
            let (t0, v0) = points[i - 1];
            let (t1, v1) = points[i];
            let fraction = (at - t0) as f64 / (t1 - t0) as f64;
            let value = v0 + (v1 - v0) * fraction;
            Some(value.clamp(v0.min(v1), v0.max(v1)))
        }
    }
}
