// Timezone conversion between UTC and the configured civil timezone
use crate::domain::errors::SensorError;
use crate::domain::reading::Reading;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Pacific::Auckland;

/// How a wall-clock time maps onto the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTimeKind {
    Valid,
    /// Falls in the repeated hour when daylight saving ends
    Ambiguous,
    /// Falls in the skipped hour when daylight saving starts
    Nonexistent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimezoneInfo {
    pub timezone: String,
    pub current_utc: DateTime<Utc>,
    pub current_local: DateTime<Tz>,
    pub is_dst: bool,
    pub utc_offset_hours: f64,
    pub dst_offset_hours: f64,
}

/// A reading paired with its local wall-clock time
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedReading<'a> {
    pub reading: &'a Reading,
    pub local: DateTime<Tz>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConverter {
    tz: Tz,
}

impl Default for TimeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl TimeConverter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self, SensorError> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| SensorError::UnknownTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse an RFC 3339 instant. Text without an explicit offset is
    /// rejected rather than guessed.
    pub fn parse_utc(text: &str) -> Result<DateTime<Utc>, SensorError> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| SensorError::InvalidTimestamp(text.to_string()))
    }

    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.tz)
    }

    pub fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, SensorError> {
        self.localize(local).map(|dt| dt.with_timezone(&Utc))
    }

    /// Attach the zone to a wall-clock time. Ambiguous times resolve to the
    /// earlier occurrence (still on daylight time); skipped times are an error.
    pub fn localize(&self, local: NaiveDateTime) -> Result<DateTime<Tz>, SensorError> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => Err(SensorError::NonexistentLocalTime {
                local,
                timezone: self.tz.name().to_string(),
            }),
        }
    }

    pub fn classify_local(&self, local: NaiveDateTime) -> LocalTimeKind {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(_) => LocalTimeKind::Valid,
            LocalResult::Ambiguous(_, _) => LocalTimeKind::Ambiguous,
            LocalResult::None => LocalTimeKind::Nonexistent,
        }
    }

    /// First instant of a local calendar day. When midnight itself is skipped
    /// the day starts at the first wall-clock time that exists.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Tz> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..=96)
            .map(|step| midnight + Duration::minutes(15 * step))
            .find(|candidate| self.classify_local(*candidate) != LocalTimeKind::Nonexistent)
            .and_then(|candidate| self.localize(candidate).ok())
            .unwrap_or_else(|| self.tz.from_utc_datetime(&midnight))
    }

    /// Pair every reading with its local time, preserving input order
    pub fn attach_local<'a>(
        &self,
        readings: impl IntoIterator<Item = &'a Reading>,
    ) -> Vec<LocalizedReading<'a>> {
        readings
            .into_iter()
            .map(|reading| LocalizedReading {
                reading,
                local: self.to_local(reading.timestamp),
            })
            .collect()
    }

    pub fn timezone_info(&self, now: DateTime<Utc>) -> TimezoneInfo {
        let local = self.to_local(now);
        let offset = local.offset();
        let utc_offset_seconds = offset.fix().local_minus_utc();
        let dst_offset = offset.dst_offset();

        TimezoneInfo {
            timezone: self.tz.name().to_string(),
            current_utc: now,
            current_local: local,
            is_dst: dst_offset > Duration::zero(),
            utc_offset_hours: utc_offset_seconds as f64 / 3600.0,
            dst_offset_hours: dst_offset.num_seconds() as f64 / 3600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            TimeConverter::from_name("Europe/Berlin").unwrap().timezone(),
            chrono_tz::Europe::Berlin
        );
        assert_eq!(
            TimeConverter::from_name("Mars/Olympus"),
            Err(SensorError::UnknownTimezone("Mars/Olympus".to_string()))
        );
        assert_eq!(TimeConverter::default().timezone(), chrono_tz::Pacific::Auckland);
    }

    #[test]
    fn test_parse_utc_requires_offset() {
        assert_eq!(
            TimeConverter::parse_utc("2025-01-01T00:00:00Z").unwrap(),
            utc(2025, 1, 1, 0, 0)
        );
        assert_eq!(
            TimeConverter::parse_utc("2025-01-01T13:00:00+13:00").unwrap(),
            utc(2025, 1, 1, 0, 0)
        );
        assert!(matches!(
            TimeConverter::parse_utc("2025-01-01 00:00:00"),
            Err(SensorError::InvalidTimestamp(_))
        ));
        assert!(TimeConverter::parse_utc("yesterday").is_err());
    }

    #[test]
    fn test_to_local_summer_and_winter() {
        let converter = TimeConverter::default();

        // NZDT is UTC+13 in January
        let summer = converter.to_local(utc(2025, 1, 1, 0, 0));
        assert_eq!(summer.naive_local(), naive(2025, 1, 1, 13, 0));

        // NZST is UTC+12 in July
        let winter = converter.to_local(utc(2025, 7, 1, 0, 0));
        assert_eq!(winter.naive_local(), naive(2025, 7, 1, 12, 0));
    }

    #[test]
    fn test_skipped_hour_is_an_error() {
        let converter = TimeConverter::default();
        // Clocks went from 02:00 to 03:00 on 2024-09-29
        let skipped = naive(2024, 9, 29, 2, 30);

        assert_eq!(converter.classify_local(skipped), LocalTimeKind::Nonexistent);
        assert!(matches!(
            converter.to_utc(skipped),
            Err(SensorError::NonexistentLocalTime { .. })
        ));
    }

    #[test]
    fn test_repeated_hour_resolves_to_earlier() {
        let converter = TimeConverter::default();
        // Clocks went from 03:00 back to 02:00 on 2024-04-07
        let repeated = naive(2024, 4, 7, 2, 30);

        assert_eq!(converter.classify_local(repeated), LocalTimeKind::Ambiguous);
        // 02:30 NZDT (+13) rather than 02:30 NZST (+12)
        assert_eq!(converter.to_utc(repeated).unwrap(), utc(2024, 4, 6, 13, 30));
    }

    #[test]
    fn test_dst_round_trip() {
        let converter = TimeConverter::default();
        let mut instant = utc(2024, 4, 6, 10, 0);
        let end = utc(2024, 4, 7, 18, 0);
        let mut checked = 0;

        while instant <= end {
            let local = converter.to_local(instant).naive_local();
            if converter.classify_local(local) == LocalTimeKind::Valid {
                assert_eq!(converter.to_utc(local).unwrap(), instant);
                checked += 1;
            }
            instant += Duration::minutes(15);
        }

        // 32 hours of quarter-hours minus the two readings of the repeated hour
        assert_eq!(checked, 129 - 8);
    }

    #[test]
    fn test_dst_round_trip_spring_forward() {
        let converter = TimeConverter::default();
        let mut instant = utc(2024, 9, 28, 10, 0);

        for _ in 0..48 {
            let local = converter.to_local(instant).naive_local();
            assert_eq!(converter.classify_local(local), LocalTimeKind::Valid);
            assert_eq!(converter.to_utc(local).unwrap(), instant);
            instant += Duration::minutes(15);
        }
    }

    #[test]
    fn test_start_of_day_skips_missing_midnight() {
        // Sao Paulo moved clocks from 00:00 to 01:00 on 2018-11-04
        let converter = TimeConverter::new(chrono_tz::America::Sao_Paulo);
        let start = converter.start_of_day(NaiveDate::from_ymd_opt(2018, 11, 4).unwrap());
        assert_eq!(start.hour(), 1);
        assert_eq!(start.with_timezone(&Utc), utc(2018, 11, 4, 3, 0));

        let auckland = TimeConverter::default();
        let start = auckland.start_of_day(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(start.with_timezone(&Utc), utc(2025, 1, 1, 11, 0));
    }

    #[test]
    fn test_attach_local_preserves_order() {
        let converter = TimeConverter::default();
        let readings = vec![
            Reading::new("wine", utc(2025, 1, 2, 0, 0)),
            Reading::new("wine", utc(2025, 1, 1, 0, 0)),
        ];

        let localized = converter.attach_local(&readings);
        assert_eq!(localized.len(), 2);
        assert_eq!(localized[0].local.naive_local(), naive(2025, 1, 2, 13, 0));
        assert_eq!(localized[1].local.naive_local(), naive(2025, 1, 1, 13, 0));
    }

    #[test]
    fn test_timezone_info() {
        let converter = TimeConverter::default();

        let summer = converter.timezone_info(utc(2025, 1, 15, 0, 0));
        assert_eq!(summer.timezone, "Pacific/Auckland");
        assert!(summer.is_dst);
        assert_eq!(summer.utc_offset_hours, 13.0);
        assert_eq!(summer.dst_offset_hours, 1.0);

        let winter = converter.timezone_info(utc(2025, 7, 15, 0, 0));
        assert!(!winter.is_dst);
        assert_eq!(winter.utc_offset_hours, 12.0);
        assert_eq!(winter.dst_offset_hours, 0.0);
    }
}
