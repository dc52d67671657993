use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::schema::{HEADER_ALIASES, TABLE_NAME, TARGET_COLUMNS};
use crate::ingest::IngestError;
use duckdb::Connection;
use r2d2::Pool;
use std::path::Path;
use tracing::{debug, info};

/// Loads taxi CSV exports with DuckDB's CSV reader.
///
/// Source headers are mapped onto the table's columns; values that do not
/// convert to the column type become NULL rather than failing the load.
pub struct TaxiCsvLoader {
    pool: Pool<DuckDBConnectionManager>,
}

impl TaxiCsvLoader {
    pub fn new(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<DuckDBConnectionManager>, IngestError> {
        self.pool
            .get()
            .map_err(|e| IngestError::DatabaseError(e.to_string()))
    }

    pub fn clear(&self) -> Result<(), IngestError> {
        let conn = self.connection()?;
        conn.execute_batch(&format!("DELETE FROM {}", TABLE_NAME))?;
        info!("Cleared table '{}'", TABLE_NAME);
        Ok(())
    }

    pub fn row_count(&self) -> Result<i64, IngestError> {
        let conn = self.connection()?;
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Appends the rows of `path`, at most `limit` of them. Returns rows inserted.
    pub fn load_file(&self, path: &Path, limit: Option<u64>) -> Result<usize, IngestError> {
        if !path.is_file() {
            return Err(IngestError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }

        let conn = self.connection()?;
        let source = csv_source(path);
        let headers = source_headers(&conn, &source)?;
        debug!("CSV headers in {}: {:?}", path.display(), headers);

        let mapped = map_columns(&headers);
        if mapped.is_empty() {
            return Err(IngestError::DatabaseError(format!(
                "{} has no recognised taxi trip columns",
                path.display()
            )));
        }

        let targets = mapped.iter().map(|(target, _)| *target).collect::<Vec<_>>().join(", ");
        let exprs = mapped.iter().map(|(_, expr)| expr.as_str()).collect::<Vec<_>>().join(", ");
        let mut sql = format!("INSERT INTO {} ({}) SELECT {} FROM {}", TABLE_NAME, targets, exprs, source);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let inserted = conn.execute(&sql, [])?;
        info!("Loaded {} rows from {}", inserted, path.display());
        Ok(inserted)
    }
}

fn csv_source(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\'', "''");
    format!("read_csv_auto('{}', header = true)", path)
}

fn source_headers(conn: &Connection, source: &str) -> Result<Vec<String>, IngestError> {
    let mut stmt = conn.prepare(&format!("DESCRIBE SELECT * FROM {}", source))?;
    let headers = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(headers)
}

/// Pairs each target column with a converting select expression over the
/// matching source header, in table order. Unmatched targets are skipped.
fn map_columns(headers: &[String]) -> Vec<(&'static str, String)> {
    TARGET_COLUMNS
        .iter()
        .filter_map(|(target, sql_type)| {
            headers
                .iter()
                .find(|header| {
                    header.as_str() == *target
                        || HEADER_ALIASES
                            .iter()
                            .any(|(alias, aliased)| header.as_str() == *alias && aliased == target)
                })
                .map(|header| {
                    let quoted = header.replace('"', "\"\"");
                    (*target, format!("TRY_CAST(\"{}\" AS {})", quoted, sql_type))
                })
        })
        .collect()
}
