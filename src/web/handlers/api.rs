use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::chart::{figure, select_chart};
use crate::db::result::Row;
use crate::db::schema::TABLE_NAME;
use crate::web::state::AppState;

// Query types

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_true")]
    pub generate_chart: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub data: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub chart: Option<Value>,
    pub chart_type: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub execution_time_ms: u64,
    /// Null on success. Failures are reported through the HTTP status and
    /// body instead, so clients reading `error` see the same field set.
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateSqlRequest {
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateSqlResponse {
    pub valid: bool,
    pub message: String,
}

// Schema and status types

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: String,
    pub table_name: String,
    pub row_count: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub llm_provider: String,
    pub llm_status: String,
    pub uptime_seconds: i64,
}

// API Implementations

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "NL Analyst API",
        "health": "/health",
        "schema": "/schema",
    }))
}

/// Reports database and provider status without forcing provider resolution.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.executor.ping().await {
        Ok(()) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {}", e),
    };

    let (llm_provider, llm_status) = match state.llm_manager.active_provider() {
        Some(provider) => (provider.kind().to_string(), "ready"),
        None => ("none".to_string(), "not_initialized"),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        database,
        llm_provider,
        llm_status: llm_status.to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchemaResponse>, (StatusCode, String)> {
    let row_count = state.executor.row_count().await.map_err(|e| {
        error!("Failed to count rows: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(SchemaResponse {
        schema: state.schema.clone(),
        table_name: TABLE_NAME.to_string(),
        row_count,
    }))
}

/// Question → SQL → rows → chart.
pub async fn process_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let question = payload.query.trim();
    if question.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query text must not be empty".to_string()));
    }
    debug!("NL-query: {}", question);

    let sql = state
        .llm_manager
        .generate_sql(question, &state.schema)
        .await
        .map_err(|e| {
            error!("SQL generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating SQL: {}", e),
            )
        })?;
    info!("Generated SQL: {}", sql);

    let start_time = Instant::now();
    let result = state.executor.execute(&sql).await.map_err(|e| {
        error!("Query execution failed: {}", e);
        (StatusCode::BAD_REQUEST, format!("SQL execution error: {}", e))
    })?;
    let execution_time_ms = start_time.elapsed().as_millis() as u64;

    let (chart, directive) = if payload.generate_chart && !result.is_empty() {
        let directive = select_chart(&result, question);
        if directive.is_none() {
            debug!("No chart applies to this result");
        }
        (figure::render(&result, &directive, question), directive)
    } else {
        (None, crate::chart::ChartDirective::none())
    };

    Ok(Json(QueryResponse {
        sql,
        row_count: result.row_count(),
        columns: result.columns,
        data: result.rows,
        chart,
        chart_type: directive.kind.map(|k| k.as_str().to_string()),
        x: directive.x,
        y: directive.y,
        execution_time_ms,
        error: None,
    }))
}

/// Drops the selected provider so the next question re-runs provider selection.
pub async fn reset_provider(State(state): State<Arc<AppState>>) -> StatusCode {
    state.llm_manager.reset();
    info!("LLM provider selection reset via API");
    StatusCode::NO_CONTENT
}

pub async fn validate_sql(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ValidateSqlRequest>,
) -> Json<ValidateSqlResponse> {
    match state.executor.validate(&payload.sql).await {
        Ok(()) => Json(ValidateSqlResponse {
            valid: true,
            message: "SQL is valid".to_string(),
        }),
        Err(e) => Json(ValidateSqlResponse {
            valid: false,
            message: e.to_string(),
        }),
    }
}
