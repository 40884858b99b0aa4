use axum::{extract::State, Json};

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{AssembleRequest, AssembleResponse, ExecuteRequest};
use crate::services::QueryService;

/// Assemble a join query from the posted descriptors
pub async fn assemble_query(
    State(state): State<AppState>,
    Json(payload): Json<AssembleRequest>,
) -> Result<Json<AssembleResponse>, AppError> {
    let query_service = QueryService::new(state.config.query.strict_aliases);
    let response = query_service.assemble(&payload.descriptors, payload.layout)?;

    Ok(Json(response))
}

/// Assemble the configured descriptors
pub async fn default_query(
    State(state): State<AppState>,
) -> Result<Json<AssembleResponse>, AppError> {
    let query_config = &state.config.query;
    if query_config.descriptors.is_empty() {
        return Err(AppError::NotFound(
            "No default descriptors configured under [query.descriptors]".to_string(),
        ));
    }

    let query_service = QueryService::new(query_config.strict_aliases);
    let response = query_service.assemble(&query_config.descriptors, query_config.layout)?;

    Ok(Json(response))
}

/// Assemble and execute a join query (configured descriptors when none are posted)
pub async fn execute_query(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let descriptors = payload
        .descriptors
        .as_deref()
        .unwrap_or(&state.config.query.descriptors);

    tracing::info!(
        "Executing join query over {} table(s) on {}",
        descriptors.len(),
        state.engine.engine_name()
    );

    let query_service = QueryService::new(state.config.query.strict_aliases);
    let query = query_service
        .execute(descriptors, payload.layout, state.engine.as_ref())
        .await?;

    Ok(Json(serde_json::json!({
        "query": query,
    })))
}

/// List tables visible to the engine
pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tables = state.engine.list_tables().await?;

    Ok(Json(serde_json::json!({
        "tables": tables,
    })))
}
