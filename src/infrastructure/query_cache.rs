// TTL cache for processed query results
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

pub struct QueryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> QueryCache<V> {
    /// `max_entries == 0` disables caching
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn put(&self, key: String, value: V) {
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                tracing::debug!("Evicted cache entry {}", oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_after_put() {
        let cache = QueryCache::new(Duration::from_secs(60), 10);
        assert_eq!(cache.get("a").await, None);

        cache.put("a".to_string(), 1).await;
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = QueryCache::new(Duration::from_millis(20), 10);
        cache.put("a".to_string(), "value".to_string()).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn test_evicts_oldest_when_full() {
        let cache = QueryCache::new(Duration::from_secs(60), 2);
        cache.put("a".to_string(), 1).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.put("b".to_string(), 2).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.put("c".to_string(), 3).await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn test_zero_capacity_disables_cache() {
        let cache = QueryCache::new(Duration::from_secs(60), 0);
        cache.put("a".to_string(), 1).await;
        assert_eq!(cache.get("a").await, None);
    }
}
