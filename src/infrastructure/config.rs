// Configuration loading - config/dashboard plus DASHBOARD__* environment overrides
use crate::application::time_converter::{DEFAULT_TIMEZONE, TimeConverter};
use crate::domain::errors::SensorError;
use crate::domain::statistics::{ComfortRange, ComfortSettings};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub timezone: TimezoneSettings,
    pub cache: CacheSettings,
    pub comfort: ComfortConfig,
    pub battery: BatterySettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "sensor_data.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimezoneSettings {
    pub name: String,
}

impl Default for TimezoneSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_TIMEZONE.name().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
    /// 0 disables the cache
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_entries: 128,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ComfortConfig {
    pub temperature: ComfortRangeConfig,
    pub humidity: ComfortRangeConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ComfortRangeConfig {
    pub field: String,
    pub ideal_midpoint: f64,
    pub half_range: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BatterySettings {
    /// Field whose values are a charge percentage, if any
    pub percentage_field: Option<String>,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            percentage_field: Some("percentage".to_string()),
        }
    }
}

impl AppConfig {
    pub fn time_converter(&self) -> Result<TimeConverter, SensorError> {
        TimeConverter::from_name(&self.timezone.name)
    }

    /// Comfort ranges, falling back to the defaults for any component whose
    /// field is left blank
    pub fn comfort_settings(&self) -> Result<ComfortSettings, SensorError> {
        let defaults = ComfortSettings::default();
        Ok(ComfortSettings {
            temperature: range_or_default(&self.comfort.temperature, defaults.temperature)?,
            humidity: range_or_default(&self.comfort.humidity, defaults.humidity)?,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn validate(&self) -> Result<(), SensorError> {
        self.time_converter()?;
        self.comfort_settings()?;
        Ok(())
    }
}

fn range_or_default(
    config: &ComfortRangeConfig,
    default: ComfortRange,
) -> Result<ComfortRange, SensorError> {
    if config.field.trim().is_empty() {
        return Ok(default);
    }
    ComfortRange::new(config.field.clone(), config.ideal_midpoint, config.half_range)
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    let app_config: AppConfig = settings.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}
