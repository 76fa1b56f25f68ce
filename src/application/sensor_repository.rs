// Repository trait for sensor data access
use crate::domain::reading::{Reading, TimeWindow};
use crate::domain::sensor::SensorTable;
use async_trait::async_trait;

#[async_trait]
pub trait SensorRepository: Send + Sync {
    /// Distinct locations across every sensor table
    async fn list_locations(&self) -> anyhow::Result<Vec<String>>;

    /// Readings from one table inside `window` (inclusive). An empty
    /// `locations` slice means every location.
    async fn fetch_readings(
        &self,
        table: SensorTable,
        window: TimeWindow,
        locations: &[String],
    ) -> anyhow::Result<Vec<Reading>>;
}
