use axum::{
    extract::{Path, State},
    Json,
};
use datafusion::prelude::SessionContext;

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{RunAllReport, RunSummary};
use crate::services::pipeline::{self, StreamTransformPipeline};

/// List configured pipeline names
pub async fn list_pipelines(State(state): State<AppState>) -> Json<serde_json::Value> {
    let names: Vec<&str> = state
        .config
        .pipelines
        .iter()
        .map(|p| p.name.as_str())
        .collect();

    Json(serde_json::json!({
        "pipelines": names,
    }))
}

/// Run one pipeline until it has caught up with its source
pub async fn run_pipeline(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RunSummary>, AppError> {
    let spec = state
        .config
        .pipeline(&name)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Pipeline {} not found", name)))?;

    tracing::info!("Running pipeline {}", name);

    let summary = StreamTransformPipeline::new(spec)
        .start(SessionContext::new())
        .await_termination()
        .await
        .map_err(|e| AppError::Pipeline(format!("{:#}", e)))?;

    refresh_sink_table(&state, &summary).await;

    Ok(Json(summary))
}

/// Run every configured pipeline concurrently.
///
/// Failed pipelines are listed next to the summaries of the ones that ran.
pub async fn run_all_pipelines(State(state): State<AppState>) -> Json<RunAllReport> {
    tracing::info!("Running {} pipeline(s)", state.config.pipelines.len());

    let report = pipeline::run_all(&state.config.pipelines).await;

    for summary in &report.summaries {
        refresh_sink_table(&state, summary).await;
    }

    if !report.failures.is_empty() {
        tracing::warn!(
            "{} of {} pipeline(s) failed",
            report.failures.len(),
            state.config.pipelines.len()
        );
    }

    Json(report)
}

/// Re-register a sink table after a run wrote to it, so join queries see it
async fn refresh_sink_table(state: &AppState, summary: &RunSummary) {
    if summary.output_file.is_none() {
        return;
    }

    let Some(spec) = state.config.pipeline(&summary.pipeline) else {
        return;
    };

    let registration = pipeline::ParquetTableSink::new(spec.sink.clone()).registration();
    if let Err(e) = state.engine.register_table(&registration).await {
        tracing::warn!("Could not refresh table {}: {}", registration.name, e);
    }
}
