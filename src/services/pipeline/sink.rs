// Parquet Table Sink
//
// Append-only parquet sink for silver tables.

use anyhow::{Context, Result};
use chrono::Utc;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::prelude::*;
use std::path::Path;
use uuid::Uuid;

use crate::models::{FileFormat, SinkSpec, TableRegistration};

pub struct ParquetTableSink {
    spec: SinkSpec,
}

impl ParquetTableSink {
    pub fn new(spec: SinkSpec) -> Self {
        Self { spec }
    }

    /// Append the batches as one new part file.
    ///
    /// Returns the written file, or `None` when there were no rows.
    pub async fn append(&self, ctx: &SessionContext, batches: Vec<RecordBatch>) -> Result<Option<String>> {
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        if rows == 0 {
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.spec.path)
            .await
            .with_context(|| format!("Failed to create table directory {}", self.spec.path))?;

        let file_name = format!(
            "part-{}-{}.parquet",
            Utc::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4().simple()
        );
        let output = Path::new(&self.spec.path)
            .join(file_name)
            .to_string_lossy()
            .into_owned();

        ctx.read_batches(batches)?
            .write_parquet(
                &output,
                DataFrameWriteOptions::new().with_single_file_output(true),
                None,
            )
            .await
            .with_context(|| format!("Failed to append to {}", self.spec.table))?;

        tracing::info!("Appended {} row(s) to {} ({})", rows, self.spec.table, output);
        Ok(Some(output))
    }

    /// Registration that exposes this sink's directory as a queryable table
    pub fn registration(&self) -> TableRegistration {
        TableRegistration {
            name: self.spec.table.clone(),
            path: format!("{}/", self.spec.path.trim_end_matches('/')),
            format: FileFormat::Parquet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::Int64Array;
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn sink(dir: &Path) -> ParquetTableSink {
        ParquetTableSink::new(SinkSpec {
            table: "dimdate".to_string(),
            path: dir.join("data").to_string_lossy().into_owned(),
            checkpoint_location: dir.join("stream_checkpoint").to_string_lossy().into_owned(),
        })
    }

    fn batch(values: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("date_key", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    #[tokio::test]
    async fn test_append_creates_part_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(dir.path());
        let ctx = SessionContext::new();

        let first = sink.append(&ctx, vec![batch(vec![1, 2])]).await.unwrap().unwrap();
        let second = sink.append(&ctx, vec![batch(vec![3])]).await.unwrap().unwrap();
        assert_ne!(first, second);
        assert!(Path::new(&first).exists());

        let registration = sink.registration();
        assert!(registration.path.ends_with("data/"));
        ctx.register_parquet("dimdate", &registration.path, ParquetReadOptions::default())
            .await
            .unwrap();
        let batches = ctx.sql("SELECT * FROM dimdate").await.unwrap().collect().await.unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = sink(dir.path());

        let output = sink.append(&SessionContext::new(), vec![batch(vec![])]).await.unwrap();
        assert!(output.is_none());
        assert!(!dir.path().join("data").exists());
    }
}
