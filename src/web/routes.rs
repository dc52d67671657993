use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// REST API for the analyst front end
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::api::root))
        .route("/health", get(handlers::api::health_check))
        .route("/schema", get(handlers::api::get_schema))
        .route("/query", post(handlers::api::process_query))
        .route("/validate-sql", post(handlers::api::validate_sql))
        .route("/llm/reset", post(handlers::api::reset_provider))
}
