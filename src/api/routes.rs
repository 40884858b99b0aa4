use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::{pipeline, query, AppState};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/tables", get(query::list_tables))
        .route("/api/queries/assemble", post(query::assemble_query))
        .route("/api/queries/default", get(query::default_query))
        .route("/api/queries/execute", post(query::execute_query))
        .route("/api/pipelines", get(pipeline::list_pipelines))
        .route("/api/pipelines/run", post(pipeline::run_all_pipelines))
        .route("/api/pipelines/{name}/run", post(pipeline::run_pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
