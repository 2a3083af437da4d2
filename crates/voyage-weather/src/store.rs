//! Persistent weather record store.
//!
//! Records are append-only: the weather core inserts and reads, it never
//! updates or deletes. `SqliteWeatherStore` is the production implementation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;
use voyage_core::{DatabaseError, RusqliteErrorExt};

use crate::types::{from_micros, WeatherRecord};

pub type StoreResult<T> = Result<T, DatabaseError>;

/// Storage seam for weather records.
pub trait WeatherStore: Send + Sync {
    /// Most recent record for exactly `location` retrieved at or after `not_older_than`.
    fn find_latest(
        &self,
        location: &str,
        not_older_than: DateTime<Utc>,
    ) -> StoreResult<Option<WeatherRecord>>;

    /// Persist a new record.
    ///
    /// # Errors
    /// Returns `DatabaseError::Duplicate` if a record with the same location and
    /// `retrieved_at` already exists.
    fn insert(&self, record: WeatherRecord) -> StoreResult<WeatherRecord>;

    /// Every location that has at least one stored record, alphabetically.
    fn distinct_locations(&self) -> StoreResult<Vec<String>>;

    /// Total number of stored records.
    fn count(&self) -> StoreResult<usize>;
}

/// SQLite-backed record store.
pub struct SqliteWeatherStore {
    conn: Mutex<Connection>,
}

impl SqliteWeatherStore {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_database_error)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for tests and throwaway sessions).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_database_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS weather_records (
                    id TEXT PRIMARY KEY,
                    location TEXT NOT NULL,
                    temperature REAL NOT NULL,
                    conditions TEXT NOT NULL,
                    forecast TEXT NOT NULL,
                    retrieved_at INTEGER NOT NULL,
                    UNIQUE (location, retrieved_at)
                );

                CREATE INDEX IF NOT EXISTS idx_weather_location_time
                    ON weather_records(location, retrieved_at DESC);
                "#,
            )
            .map_err(RusqliteErrorExt::into_database_error)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRecord> {
        let id_str: String = row.get(0)?;
        let retrieved_micros: i64 = row.get(5)?;

        let id = Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let retrieved_at = from_micros(retrieved_micros).ok_or(
            rusqlite::Error::IntegralValueOutOfRange(5, retrieved_micros),
        )?;

        Ok(WeatherRecord {
            id,
            location: row.get(1)?,
            temperature: row.get(2)?,
            conditions: row.get(3)?,
            forecast: row.get(4)?,
            retrieved_at,
        })
    }
}

impl WeatherStore for SqliteWeatherStore {
    fn find_latest(
        &self,
        location: &str,
        not_older_than: DateTime<Utc>,
    ) -> StoreResult<Option<WeatherRecord>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, location, temperature, conditions, forecast, retrieved_at
                 FROM weather_records
                 WHERE location = ?1 AND retrieved_at >= ?2
                 ORDER BY retrieved_at DESC
                 LIMIT 1",
                params![location, not_older_than.timestamp_micros()],
                Self::row_to_record,
            )
            .optional()
            .map_err(RusqliteErrorExt::into_database_error)
    }

    fn insert(&self, record: WeatherRecord) -> StoreResult<WeatherRecord> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO weather_records
                 (id, location, temperature, conditions, forecast, retrieved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.to_string(),
                    record.location,
                    record.temperature,
                    record.conditions,
                    record.forecast,
                    record.retrieved_at.timestamp_micros(),
                ],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;

        tracing::debug!("Stored weather record {} for {}", record.id, record.location);
        Ok(record)
    }

    fn distinct_locations(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT DISTINCT location FROM weather_records ORDER BY location")
            .map_err(RusqliteErrorExt::into_database_error)?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_database_error)?;

        rows.collect::<Result<Vec<String>, _>>()
            .map_err(RusqliteErrorExt::into_database_error)
    }

    fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM weather_records", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
