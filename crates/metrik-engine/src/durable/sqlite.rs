//! SQLite-backed durable store.
//!
//! Single `metrics` table with indices on metric name and timestamp, WAL
//! journaling, and JSON text columns for tags/context. The connection sits
//! behind a `parking_lot::Mutex<Option<_>>`; close takes the connection out
//! so later calls fail cleanly instead of touching a dead handle.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde_json::Value;

use metrik_core::record::{MetricRecord, MetricValue};
use metrik_core::{MetrikError, Result};

use super::{DurableAppend, DurableMetricsStore, DurableQuery};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    component TEXT,
    metric_name TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT,
    tags TEXT,
    context TEXT,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metrics_name_ts ON metrics (metric_name, timestamp);
CREATE INDEX IF NOT EXISTS idx_metrics_ts ON metrics (timestamp);
";

pub struct SqliteMetricsStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteMetricsStore {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| MetrikError::Storage(format!("open {path}: {e}")))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| MetrikError::Storage(format!("pragmas: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| MetrikError::Storage(format!("schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| MetrikError::Storage("connection closed".into()))?;
        f(conn).map_err(|e| MetrikError::Storage(e.to_string()))
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetricRecord> {
    let component: Option<String> = row.get("component")?;
    let metric_name: String = row.get("metric_name")?;
    let value: f64 = row.get("value")?;
    let tags: Option<String> = row.get("tags")?;
    let context: Option<String> = row.get("context")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(MetricRecord {
        metric_id: metric_name,
        value: MetricValue::Float(value),
        timestamp,
        source: component,
        tags: tags
            .as_deref()
            .and_then(|t| serde_json::from_str::<Vec<String>>(t).ok())
            .unwrap_or_default(),
        context: context
            .as_deref()
            .and_then(|c| serde_json::from_str::<Value>(c).ok()),
    })
}

#[async_trait]
impl DurableMetricsStore for SqliteMetricsStore {
    async fn append(&self, row: DurableAppend) -> Result<()> {
        let tags_json = if row.tags.is_empty() {
            None
        } else {
            serde_json::to_string(&row.tags).ok()
        };
        let context_json = row.context.as_ref().and_then(|c| serde_json::to_string(c).ok());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO metrics (component, metric_name, value, unit, tags, context, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.component,
                    row.metric_name,
                    row.value,
                    row.unit,
                    tags_json,
                    context_json,
                    row.timestamp,
                ],
            )
            .map(|_| ())
        })
    }

    async fn query(&self, filter: &DurableQuery) -> Result<Vec<MetricRecord>> {
        let mut sql = String::from(
            "SELECT component, metric_name, value, tags, context, timestamp FROM metrics",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(component) = &filter.component {
            clauses.push("component = ?");
            args.push(component.clone());
        }
        if let Some(metric_name) = &filter.metric_name {
            clauses.push("metric_name = ?");
            args.push(metric_name.clone());
        }
        if let Some(start) = &filter.start_time {
            clauses.push("timestamp >= ?");
            args.push(start.clone());
        }
        if let Some(end) = &filter.end_time {
            clauses.push("timestamp <= ?");
            args.push(end.clone());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ?");
        let limit = if filter.limit == 0 { 1000 } else { filter.limit };

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut params_vec: Vec<&dyn rusqlite::ToSql> =
                args.iter().map(|a| a as &dyn rusqlite::ToSql).collect();
            let limit_i64 = limit as i64;
            params_vec.push(&limit_i64);
            let rows = stmt.query_map(params_vec.as_slice(), row_to_record)?;
            rows.collect()
        })
    }

    async fn delete_older_than(&self, cutoff: &str) -> Result<u64> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM metrics WHERE timestamp < ?1", params![cutoff])
                .map(|n| n as u64)
        })
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            // rusqlite hands the connection back on failure; drop it anyway.
            if let Err((_conn, e)) = conn.close() {
                return Err(MetrikError::Storage(format!("close: {e}")));
            }
        }
        Ok(())
    }
}
