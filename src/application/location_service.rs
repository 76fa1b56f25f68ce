// Location service - Use case for listing sensor locations
use crate::application::sensor_repository::SensorRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct LocationService {
    repository: Arc<dyn SensorRepository>,
}

impl LocationService {
    pub fn new(repository: Arc<dyn SensorRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_locations(&self) -> anyhow::Result<Vec<String>> {
        let mut locations = self.repository.list_locations().await?;
        locations.retain(|l| !l.trim().is_empty());
        locations.sort();
        locations.dedup();
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::{Reading, TimeWindow};
    use crate::domain::sensor::SensorTable;
    use async_trait::async_trait;

    struct FixedLocations(Vec<&'static str>);

    #[async_trait]
    impl SensorRepository for FixedLocations {
        async fn list_locations(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.0.iter().map(|l| l.to_string()).collect())
        }

        async fn fetch_readings(
            &self,
            _table: SensorTable,
            _window: TimeWindow,
            _locations: &[String],
        ) -> anyhow::Result<Vec<Reading>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_list_locations_sorted_and_unique() {
        let service = LocationService::new(Arc::new(FixedLocations(vec!["wine", "garage", "", "wine"])));
        assert_eq!(service.list_locations().await.unwrap(), vec!["garage", "wine"]);
    }
}
