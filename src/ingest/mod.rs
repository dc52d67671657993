// Bulk loading of NYC taxi CSV exports into the trips table.
pub mod csv;

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum IngestError {
    IoError(std::io::Error),
    DatabaseError(String),
    NoInputFiles(PathBuf),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::IoError(err) => write!(f, "IO error: {}", err),
            IngestError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            IngestError::NoInputFiles(dir) => write!(f, "No CSV files found in {}", dir.display()),
        }
    }
}

impl Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::IoError(err)
    }
}

impl From<duckdb::Error> for IngestError {
    fn from(err: duckdb::Error) -> Self {
        IngestError::DatabaseError(err.to_string())
    }
}

/// Lists `*.csv` files in `dir`, sorted by name.
pub fn csv_files_in(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(IngestError::NoInputFiles(dir.to_path_buf()));
    }
    Ok(files)
}
