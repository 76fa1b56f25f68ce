// Strategy selection - Picks an aggregation granularity for a time span
use crate::domain::aggregation::Strategy;
use crate::domain::errors::SensorError;
use chrono::Duration;

const RAW_MAX_DAYS: i64 = 1;
const HOURLY_MAX_DAYS: i64 = 7;
const DAILY_MAX_DAYS: i64 = 30;

pub struct StrategySelector;

impl StrategySelector {
    /// An explicit choice always wins. Without one, the span decides; each
    /// threshold is inclusive on the finer strategy. `Interpolate` is never
    /// chosen automatically.
    pub fn select(span: Duration, explicit_choice: Option<&str>) -> Result<Strategy, SensorError> {
        if let Some(choice) = explicit_choice {
            return choice.parse();
        }

        let strategy = if span <= Duration::days(RAW_MAX_DAYS) {
            Strategy::Raw
        } else if span <= Duration::days(HOURLY_MAX_DAYS) {
            Strategy::Hourly
        } else if span <= Duration::days(DAILY_MAX_DAYS) {
            Strategy::Daily
        } else {
            Strategy::Weekly
        };
        Ok(strategy)
    }
}
