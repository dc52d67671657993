pub mod db_pool;
pub mod executor;
pub mod result;
pub mod schema;

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum DbError {
    Pool(String),
    Query(String),
    Task(String),
}

impl DbError {
    pub fn query(err: impl fmt::Display) -> Self {
        DbError::Query(err.to_string())
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Pool(msg) => write!(f, "Connection pool error: {}", msg),
            DbError::Query(msg) => write!(f, "{}", msg),
            DbError::Task(msg) => write!(f, "Database task failed: {}", msg),
        }
    }
}

impl Error for DbError {}
