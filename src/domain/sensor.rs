// Sensor tables written by the ingestion server

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorTable {
    TempHumidity,
    Battery,
    AirQuality,
}

impl SensorTable {
    pub const ALL: [SensorTable; 3] = [Self::TempHumidity, Self::Battery, Self::AirQuality];

    /// Resolve the route segment used by the API
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "temp_humidity" | "climate" => Some(Self::TempHumidity),
            "battery" | "nano_cell_battery" => Some(Self::Battery),
            "air_quality" | "sgp41_voc_data" => Some(Self::AirQuality),
            _ => None,
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::TempHumidity => "temp_humidity",
            Self::Battery => "nano_cell_battery",
            Self::AirQuality => "sgp41_voc_data",
        }
    }

    /// Numeric columns that become value fields
    pub fn value_columns(&self) -> &'static [&'static str] {
        match self {
            Self::TempHumidity => &["temperature", "humidity"],
            Self::Battery => &["voltage", "percentage", "dischargerate"],
            Self::AirQuality => &["voc_raw", "nox_raw", "temperature", "humidity"],
        }
    }
}
