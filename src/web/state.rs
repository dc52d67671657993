use crate::config::AppConfig;
use crate::db::executor::QueryExecutor;
use crate::db::schema::TABLE_SCHEMA;
use crate::llm::LlmManager;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub executor: QueryExecutor,
    pub llm_manager: LlmManager,
    /// Schema description sent to the LLM with every question.
    pub schema: String,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, executor: QueryExecutor, llm_manager: LlmManager) -> Self {
        Self {
            config,
            executor,
            llm_manager,
            schema: TABLE_SCHEMA.to_string(),
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (chrono::Utc::now() - self.startup_time).num_seconds()
    }
}
