// Ingest Pipeline Module
//
// Run-once bronze -> silver pipelines:
// 1. FileStreamSource discovers files not yet in the checkpoint ledger
// 2. TransformPlanner renders transforms + dedupe as one SQL query
// 3. ParquetTableSink appends the result as a new part file
// 4. ProgressLedger commits the processed files (after the write)

pub mod checkpoint;
pub mod sink;
pub mod source;
pub mod transform;

pub use checkpoint::{CheckpointLock, ProgressLedger};
pub use sink::ParquetTableSink;
pub use source::{FileStreamSource, SourceFile};
pub use transform::TransformPlanner;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use datafusion::prelude::*;
use datafusion::arrow::record_batch::RecordBatch;
use tokio::task::JoinHandle;

use crate::models::{PipelineSpec, RunAllReport, RunFailure, RunSummary};

/// Handle to a pipeline run started with [`StreamTransformPipeline::start`]
pub struct CompletionHandle {
    pipeline: String,
    handle: JoinHandle<Result<RunSummary>>,
}

impl CompletionHandle {
    /// Wait until the run has caught up with its source and stopped
    pub async fn await_termination(self) -> Result<RunSummary> {
        self.handle
            .await
            .map_err(|e| anyhow!("Pipeline {} task failed: {}", self.pipeline, e))?
    }
}

/// One bronze -> silver pipeline
pub struct StreamTransformPipeline {
    spec: PipelineSpec,
    source: FileStreamSource,
    sink: ParquetTableSink,
}

impl StreamTransformPipeline {
    pub fn new(spec: PipelineSpec) -> Self {
        Self {
            source: FileStreamSource::new(spec.source.clone()),
            sink: ParquetTableSink::new(spec.sink.clone()),
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn sink(&self) -> &ParquetTableSink {
        &self.sink
    }

    /// Start a run-once execution in the background
    pub fn start(self, ctx: SessionContext) -> CompletionHandle {
        let pipeline = self.spec.name.clone();
        let handle = tokio::spawn(async move { self.run_once(&ctx).await });
        CompletionHandle { pipeline, handle }
    }

    /// Process every new source file in a single batch, then stop.
    ///
    /// Runs sharing a checkpoint location wait for each other, so a file is
    /// appended by at most one of them.
    pub async fn run_once(&self, ctx: &SessionContext) -> Result<RunSummary> {
        let name = &self.spec.name;
        let checkpoint = self.spec.sink.checkpoint_location.as_str();

        let _writer = CheckpointLock::acquire(checkpoint).await;
        let mut ledger = ProgressLedger::load(checkpoint).await?;
        let files = self.source.discover(&ledger).await?;

        if files.is_empty() {
            tracing::info!("Pipeline {}: no new files in {}", name, self.spec.source.path);
            return Ok(self.summary(0, 0, None));
        }

        tracing::info!("Pipeline {}: {} new file(s)", name, files.len());

        let df = self.source.read(ctx, &files).await?;
        self.source.record_schema(df.schema()).await?;

        let columns: Vec<String> = df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let sql = TransformPlanner::render(
            &self.staging_name(),
            &columns,
            &self.spec.transforms,
            &self.spec.dedupe_key,
        )
        .with_context(|| format!("Invalid transforms for pipeline {}", name))?;
        tracing::debug!("Pipeline {} transform query: {}", name, sql);

        let (batches, rows_written) = self.transform(ctx, df, &sql).await?;
        let output_file = self.sink.append(ctx, batches).await?;

        ledger
            .commit(checkpoint, files.iter().map(|f| f.name.clone()))
            .await?;

        tracing::info!(
            "Pipeline {}: wrote {} row(s) from {} file(s) to {}",
            name,
            rows_written,
            files.len(),
            self.spec.sink.table
        );

        Ok(self.summary(files.len(), rows_written, output_file))
    }

    /// Run the transform query over the batch registered under a per-run name
    async fn transform(
        &self,
        ctx: &SessionContext,
        df: DataFrame,
        sql: &str,
    ) -> Result<(Vec<RecordBatch>, usize)> {
        let staging = self.staging_name();
        ctx.register_table(staging.as_str(), df.into_view())?;

        let result = async {
            let batches = ctx.sql(sql).await?.collect().await?;
            let rows = batches.iter().map(|b| b.num_rows()).sum();
            Ok::<_, datafusion::error::DataFusionError>((batches, rows))
        }
        .await;

        ctx.deregister_table(staging.as_str())?;
        result.with_context(|| format!("Transform query failed for pipeline {}", self.spec.name))
    }

    fn staging_name(&self) -> String {
        format!("bronze_{}", self.spec.name.to_lowercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"))
    }

    fn summary(&self, files_processed: usize, rows_written: usize, output_file: Option<String>) -> RunSummary {
        RunSummary {
            pipeline: self.spec.name.clone(),
            table: self.spec.sink.table.clone(),
            files_processed,
            rows_written,
            output_file,
            completed_at: Utc::now(),
        }
    }
}

/// Run several pipelines concurrently, each against its own session.
///
/// Every pipeline runs to completion; one failing does not hide the others.
pub async fn run_all(specs: &[PipelineSpec]) -> RunAllReport {
    let handles = specs
        .iter()
        .cloned()
        .map(|spec| StreamTransformPipeline::new(spec).start(SessionContext::new()))
        .map(|handle| handle.await_termination());

    let results = futures::future::join_all(handles).await;

    let mut report = RunAllReport::default();
    for (spec, result) in specs.iter().zip(results) {
        match result {
            Ok(summary) => report.summaries.push(summary),
            Err(e) => {
                tracing::error!("Pipeline {} failed: {:#}", spec.name, e);
                report.failures.push(RunFailure {
                    pipeline: spec.name.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    report
}
