// Dashboard service - Use case for fetching, resampling and summarizing readings
use crate::application::sensor_repository::SensorRepository;
use crate::application::series_aggregator::SeriesAggregator;
use crate::application::statistics_summarizer::StatisticsSummarizer;
use crate::application::strategy_selector::StrategySelector;
use crate::domain::aggregation::{AggregationResult, Strategy};
use crate::domain::reading::{Series, TimeWindow};
use crate::domain::sensor::SensorTable;
use crate::domain::statistics::Statistics;
use crate::infrastructure::query_cache::QueryCache;
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SeriesQuery {
    pub table: SensorTable,
    pub window: TimeWindow,
    pub locations: Vec<String>,
    /// `None` selects a strategy from the window span
    pub strategy: Option<String>,
    pub bucket_width: Option<Duration>,
}

impl SeriesQuery {
    fn cache_key(&self, strategy: Strategy) -> String {
        let mut locations = self.locations.clone();
        locations.sort();
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.table.table_name(),
            self.window.start.to_rfc3339(),
            self.window.end.to_rfc3339(),
            locations.join(","),
            strategy,
            self.bucket_width.map(|w| w.num_milliseconds()).unwrap_or_default()
        )
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn SensorRepository>,
    aggregator: SeriesAggregator,
    summarizer: StatisticsSummarizer,
    cache: Arc<QueryCache<AggregationResult>>,
}

impl DashboardService {
    pub fn new(
        repository: Arc<dyn SensorRepository>,
        aggregator: SeriesAggregator,
        summarizer: StatisticsSummarizer,
        cache: Arc<QueryCache<AggregationResult>>,
    ) -> Self {
        Self {
            repository,
            aggregator,
            summarizer,
            cache,
        }
    }

    pub async fn aggregated_series(&self, query: &SeriesQuery) -> anyhow::Result<AggregationResult> {
        // Strategy errors surface before any I/O
        let strategy = StrategySelector::select(query.window.span(), query.strategy.as_deref())?;
        let key = query.cache_key(strategy);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(cached);
        }
        tracing::debug!("Cache miss for {} (hit rate {:.2})", key, self.cache.hit_rate());

        let readings = self
            .repository
            .fetch_readings(query.table, query.window, &query.locations)
            .await
            .with_context(|| format!("Failed to fetch readings from {}", query.table.table_name()))?;

        let series = Series::new(readings);
        let result = self.aggregator.aggregate(&series, strategy, query.bucket_width)?;

        let summary = result.summary();
        tracing::info!(
            "Aggregated {} readings from {} into {} buckets using {} strategy",
            summary.original_count,
            query.table.table_name(),
            summary.aggregated_count,
            summary.strategy
        );

        self.cache.put(key, result.clone()).await;
        Ok(result)
    }

    /// Statistics over the same resampled series the charts show
    pub async fn statistics(&self, query: &SeriesQuery) -> anyhow::Result<Statistics> {
        let result = self.aggregated_series(query).await?;
        Ok(self.summarizer.summarize(&result))
    }
}
