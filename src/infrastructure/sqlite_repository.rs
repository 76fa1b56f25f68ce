// SQLite repository implementation over the ingestion server's tables
use crate::application::sensor_repository::SensorRepository;
use crate::domain::reading::{Reading, TimeWindow};
use crate::domain::sensor::SensorTable;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

const STORED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open an existing database read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        tracing::info!("Opened sensor database {}", path.display());
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("SQLite connection lock poisoned"))?;
            f(&conn)
        })
        .await
        .context("SQLite task failed")?
    }
}

#[async_trait]
impl SensorRepository for SqliteRepository {
    async fn list_locations(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut locations = BTreeSet::new();
            for table in SensorTable::ALL {
                let columns = table_columns(conn, table.table_name())?;
                if !columns.contains("location") {
                    continue;
                }
                let sql = format!("SELECT DISTINCT location FROM {}", table.table_name());
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
                for location in rows {
                    locations.extend(location?.filter(|l| !l.trim().is_empty()));
                }
            }
            tracing::debug!("Found {} locations", locations.len());
            Ok(locations.into_iter().collect())
        })
        .await
    }

    async fn fetch_readings(
        &self,
        table: SensorTable,
        window: TimeWindow,
        locations: &[String],
    ) -> Result<Vec<Reading>> {
        let locations = locations.to_vec();
        self.with_connection(move |conn| query_readings(conn, table, window, &locations))
            .await
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<HashSet<String>>>()
        .with_context(|| format!("Failed to read schema of {}", table))?;
    Ok(columns)
}

fn query_readings(
    conn: &Connection,
    table: SensorTable,
    window: TimeWindow,
    locations: &[String],
) -> Result<Vec<Reading>> {
    let table_name = table.table_name();
    let columns = table_columns(conn, table_name)?;
    if columns.is_empty() {
        tracing::warn!("Table {} does not exist", table_name);
        return Ok(Vec::new());
    }
    if !columns.contains("location") || !columns.contains("timestamp") {
        anyhow::bail!("Table {} is missing its location or timestamp column", table_name);
    }

    let has_mac = columns.contains("mac");
    let value_columns: Vec<&str> = table
        .value_columns()
        .iter()
        .copied()
        .filter(|c| columns.contains(*c))
        .collect();

    let mut selected = vec!["location", "timestamp"];
    if has_mac {
        selected.push("mac");
    }
    let values_offset = selected.len();
    selected.extend(&value_columns);

    let mut sql = format!(
        "SELECT {} FROM {} WHERE timestamp BETWEEN ? AND ?",
        selected.join(", "),
        table_name
    );
    let mut params = vec![
        window.start.naive_utc().format(STORED_TIMESTAMP_FORMAT).to_string(),
        window.end.naive_utc().format(STORED_TIMESTAMP_FORMAT).to_string(),
    ];
    if !locations.is_empty() {
        let placeholders = vec!["?"; locations.len()].join(",");
        sql.push_str(&format!(" AND location IN ({})", placeholders));
        params.extend(locations.iter().cloned());
    }
    sql.push_str(" ORDER BY timestamp");

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("Failed to prepare query on {}", table_name))?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

    let mut readings = Vec::new();
    let mut skipped = 0usize;
    let mut unlocated = 0usize;
    while let Some(row) = rows.next()? {
        let Some(location) = row
            .get::<_, Option<String>>(0)?
            .filter(|l| !l.trim().is_empty())
        else {
            unlocated += 1;
            continue;
        };
        let Some(timestamp) = row_timestamp(row, 1)? else {
            skipped += 1;
            continue;
        };

        let mut reading = Reading::new(location, timestamp);
        if has_mac {
            if let Some(mac) = row.get::<_, Option<String>>(2)? {
                reading = reading.with_device_id(mac);
            }
        }
        for (i, column) in value_columns.iter().enumerate() {
            if let Some(value) = numeric_value(row.get_ref(values_offset + i)?) {
                reading = reading.with_value(*column, value);
            }
        }
        readings.push(reading);
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} rows with unreadable timestamps in {}", skipped, table_name);
    }
    if unlocated > 0 {
        tracing::warn!("Skipped {} rows without a location in {}", unlocated, table_name);
    }
    tracing::debug!("Fetched {} rows from {}", readings.len(), table_name);
    Ok(readings)
}

/// Window bounds are compared as text, so only TEXT timestamps can match
fn row_timestamp(row: &Row<'_>, index: usize) -> Result<Option<DateTime<Utc>>> {
    Ok(match row.get_ref(index)? {
        ValueRef::Text(text) => std::str::from_utf8(text).ok().and_then(parse_stored_timestamp),
        _ => None,
    })
}

/// Stored timestamps are naive UTC; an explicit offset is honoured if present
pub fn parse_stored_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, STORED_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

fn numeric_value(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(text) => std::str::from_utf8(text).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn repository() -> SqliteRepository {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE temp_humidity (
                location TEXT, mac TEXT, temperature NUMERIC, humidity NUMERIC, timestamp TEXT
             );
             CREATE TABLE nano_cell_battery (
                location TEXT, voltage NUMERIC, percentage NUMERIC, timestamp TEXT
             );
             INSERT INTO temp_humidity VALUES
                ('wine', 'aa:bb', 12.5, 71, '2025-01-01 00:00:00'),
                ('wine', 'aa:bb', 12.75, NULL, '2025-01-01 01:00:00.250000'),
                ('office', 'cc:dd', 21.0, 48.5, '2025-01-01 00:30:00'),
                ('office', 'cc:dd', 21.5, 49.0, 'not a time'),
                ('garage', NULL, 8.0, 80.0, '2025-01-02 00:00:00'),
                ('   ', 'ee:ff', 15.0, 60.0, '2025-01-01 02:00:00'),
                (NULL, 'ee:ff', 15.5, 61.0, '2025-01-01 03:00:00');
             INSERT INTO nano_cell_battery VALUES
                ('shed', 3.7, 64, '2025-01-01 00:00:00');",
        )
        .unwrap();
        SqliteRepository::from_connection(conn)
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_locations_across_tables() {
        let locations = repository().list_locations().await.unwrap();
        assert_eq!(locations, vec!["garage", "office", "shed", "wine"]);
    }

    #[tokio::test]
    async fn test_fetch_readings_in_window_ordered() {
        let readings = repository()
            .fetch_readings(SensorTable::TempHumidity, window(), &[])
            .await
            .unwrap();

        // Rows with a blank or missing location are dropped
        let locations: Vec<&str> = readings.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["wine", "office", "wine"]);
        assert_eq!(readings[0].device_id.as_deref(), Some("aa:bb"));
        assert_eq!(readings[0].value("humidity"), Some(71.0));
        assert_eq!(readings[2].value("humidity"), None);
        assert_eq!(readings[2].timestamp.timestamp_subsec_millis(), 250);
    }

    #[tokio::test]
    async fn test_fetch_readings_filters_locations() {
        let readings = repository()
            .fetch_readings(SensorTable::TempHumidity, window(), &["office".to_string()])
            .await
            .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value("temperature"), Some(21.0));
    }

    #[tokio::test]
    async fn test_missing_columns_are_skipped() {
        let readings = repository()
            .fetch_readings(SensorTable::Battery, window(), &[])
            .await
            .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value("percentage"), Some(64.0));
        assert_eq!(readings[0].value("dischargerate"), None);
        assert_eq!(readings[0].device_id, None);
    }

    #[tokio::test]
    async fn test_missing_table_yields_no_readings() {
        let readings = repository()
            .fetch_readings(SensorTable::AirQuality, window(), &[])
            .await
            .unwrap();
        assert!(readings.is_empty());
    }

    #[test]
    fn test_parse_stored_timestamp() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 9, 15, 0).unwrap();
        assert_eq!(parse_stored_timestamp("2025-03-01 09:15:00"), Some(expected));
        assert_eq!(parse_stored_timestamp("2025-03-01T09:15:00"), Some(expected));
        assert_eq!(parse_stored_timestamp("2025-03-01T22:15:00+13:00"), Some(expected));
        assert_eq!(parse_stored_timestamp("yesterday"), None);
    }
}
