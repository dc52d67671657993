use duckdb::Connection;
use r2d2::ManageConnection;
use std::sync::Mutex;

/// Hands out clones of one DuckDB connection so every pooled connection
/// shares the same database instance (required for `:memory:` and for
/// avoiding duplicate file handles within one process).
pub struct DuckDBConnectionManager {
    base: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn open(path: &str) -> Result<Self, duckdb::Error> {
        let base = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Ok(Self {
            base: Mutex::new(base),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let base = self.base.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        base.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
