use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::result::{Row, TabularResult};
use crate::db::schema::{CREATE_TABLE_SQL, TABLE_NAME};
use crate::db::DbError;
use arrow::record_batch::RecordBatch;
use r2d2::{Pool, PooledConnection};
use tracing::{debug, info};

/// Runs SQL against the pooled DuckDB database off the async runtime.
#[derive(Clone)]
pub struct QueryExecutor {
    pool: Pool<DuckDBConnectionManager>,
}

impl QueryExecutor {
    pub fn new(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool }
    }

    /// Opens `path` (or `:memory:`) with a pool of `pool_size` connections.
    pub fn open(path: &str, pool_size: u32) -> Result<Self, DbError> {
        let manager = DuckDBConnectionManager::open(path).map_err(DbError::query)?;
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| DbError::Pool(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool<DuckDBConnectionManager> {
        &self.pool
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PooledConnection<DuckDBConnectionManager>) -> Result<T, DbError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| DbError::Pool(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| DbError::Task(e.to_string()))?
    }

    /// Creates the trips table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        self.with_connection(|conn| conn.execute_batch(CREATE_TABLE_SQL).map_err(DbError::query))
            .await?;
        info!("Ensured table '{}' exists", TABLE_NAME);
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        self.with_connection(|conn| conn.execute_batch("SELECT 1").map_err(DbError::query))
            .await
    }

    pub async fn row_count(&self) -> Result<i64, DbError> {
        self.with_connection(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| row.get(0))
                .map_err(DbError::query)
        })
        .await
    }

    /// Checks that `sql` parses and binds, without running it.
    pub async fn validate(&self, sql: &str) -> Result<(), DbError> {
        let explain = format!("EXPLAIN {}", sql);
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&explain).map_err(DbError::query)?;
            stmt.query_arrow([]).map_err(DbError::query)?.for_each(drop);
            Ok(())
        })
        .await
    }

    /// Runs `sql` and returns its rows as JSON objects keyed by column name.
    pub async fn execute(&self, sql: &str) -> Result<TabularResult, DbError> {
        let sql = sql.to_string();
        self.with_connection(move |conn| {
            let start = std::time::Instant::now();
            let mut stmt = conn.prepare(&sql).map_err(DbError::query)?;
            let arrow_batch = stmt.query_arrow([]).map_err(DbError::query)?;

            let columns = arrow_batch
                .get_schema()
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect::<Vec<String>>();
            let batches: Vec<RecordBatch> = arrow_batch.collect();

            let rows = batches_to_rows(&batches)?;
            debug!(
                "Query returned {} rows in {} ms",
                rows.len(),
                start.elapsed().as_millis()
            );
            Ok(TabularResult::new(columns, rows))
        })
        .await
    }
}

fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, DbError> {
    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer
        .write_batches(&refs)
        .map_err(|e| DbError::Query(format!("failed to encode results: {}", e)))?;
    writer
        .finish()
        .map_err(|e| DbError::Query(format!("failed to encode results: {}", e)))?;

    let buffer = writer.into_inner();
    if buffer.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&buffer).map_err(|e| DbError::Query(format!("failed to decode results: {}", e)))
}
