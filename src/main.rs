use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod chart;
mod config;
mod db;
mod ingest;
mod llm;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs, Command};
use crate::db::executor::QueryExecutor;
use crate::ingest::csv::TaxiCsvLoader;
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    init_tracing();

    let args = CliArgs::parse();

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Opening DuckDB database at {}", config.database.path);
    let executor = QueryExecutor::open(&config.database.path, config.database.pool_size)?;
    executor.ensure_schema().await?;

    match args.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(config, executor).await,
        Command::Load { file, dir, limit, clear } => load(executor, file, dir, limit, clear).await,
    }
}

async fn serve(config: AppConfig, executor: QueryExecutor) -> Result<(), Box<dyn std::error::Error>> {
    // Provider is resolved on the first question, not at startup
    let llm_manager = LlmManager::new(&config.llm);
    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, executor, llm_manager));

    info!("Starting NL Analyst server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

async fn load(
    executor: QueryExecutor,
    file: Option<PathBuf>,
    dir: PathBuf,
    limit: Option<u64>,
    clear: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = match file {
        Some(file) => vec![file],
        None => ingest::csv_files_in(&dir)?,
    };
    info!("Loading {} CSV file(s)", files.len());

    let loader = TaxiCsvLoader::new(executor.pool().clone());
    let (initial, total) = tokio::task::spawn_blocking(move || -> Result<(i64, i64), ingest::IngestError> {
        if clear {
            loader.clear()?;
        }
        let initial = loader.row_count()?;
        for file in &files {
            loader.load_file(file, limit)?;
        }
        Ok((initial, loader.row_count()?))
    })
    .await??;

    info!("Loading complete: {} rows loaded, {} rows in table", total - initial, total);
    Ok(())
}
