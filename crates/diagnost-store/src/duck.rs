//! DuckDB-backed recommendation lookup.
//!
//! Reads the `recommendations(label VARCHAR, data VARCHAR)` table by exact
//! label match, one row at most.

use std::path::Path;
use std::sync::Mutex;

use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use tracing::info;

use crate::{RecommendationStore, StoreError};

/// Recommendation table in a DuckDB database.
///
/// `Connection` is `Send` but not `Sync`, so lookups share it through a mutex.
pub struct DuckRecommendations {
    conn: Mutex<Connection>,
}

impl DuckRecommendations {
    /// Open an existing database file. The file must already exist.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        let count = store.count()?;
        info!(count, path = %path.display(), "opened recommendations table");
        Ok(store)
    }

    /// Number of rows in the `recommendations` table.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT count(*)::BIGINT AS cnt FROM recommendations")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let batch = batches
            .first()
            .ok_or_else(|| StoreError::Other("count returned no rows".into()))?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("duckdb connection lock poisoned".into()))
    }
}

/// Scratch in-memory tables for tests.
#[cfg(test)]
impl DuckRecommendations {
    /// Open an in-memory database with an empty `recommendations` table.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// Create the `recommendations` table if it does not exist.
    pub fn ensure_table(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS recommendations (label VARCHAR, data VARCHAR)",
        )?;
        Ok(())
    }

    pub fn insert(&self, label: &str, data: &str) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO recommendations (label, data) VALUES (?, ?)",
            [label, data],
        )?;
        Ok(())
    }
}

impl RecommendationStore for DuckRecommendations {
    fn recommendation(&self, label: &str) -> Result<String, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM recommendations WHERE label = ? LIMIT 1")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([label])?.collect();
        let found = batches
            .iter()
            .find(|b| b.num_rows() > 0)
            .and_then(|b| get_string(b.column(0).as_ref(), 0));
        Ok(found.unwrap_or_default())
    }
}

/// Extract a string value from an Arrow array (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}
