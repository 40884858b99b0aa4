// Incremental File Source
//
// Each run picks up the files in the source directory that the checkpoint
// ledger has not seen yet and reads them as one DataFrame.

use anyhow::{Context, Result};
use datafusion::common::DFSchema;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::checkpoint::ProgressLedger;
use crate::models::{FileFormat, SourceSpec};

const SCHEMA_FILE: &str = "schema.json";

/// A newly discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name, used as the ledger key
    pub name: String,
    pub path: PathBuf,
}

/// Column recorded at the schema location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedColumn {
    pub name: String,
    pub data_type: String,
}

pub struct FileStreamSource {
    spec: SourceSpec,
}

impl FileStreamSource {
    pub fn new(spec: SourceSpec) -> Self {
        Self { spec }
    }

    /// Files with the source format's extension not yet in the ledger, sorted by name
    pub async fn discover(&self, ledger: &ProgressLedger) -> Result<Vec<SourceFile>> {
        let extension = self.spec.format.extension();
        let mut entries = tokio::fs::read_dir(&self.spec.path)
            .await
            .with_context(|| format!("Failed to list source directory {}", self.spec.path))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !ledger.contains(&name) {
                files.push(SourceFile { name, path });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Read the given files as a single DataFrame
    pub async fn read(&self, ctx: &SessionContext, files: &[SourceFile]) -> Result<DataFrame> {
        let paths: Vec<String> = files
            .iter()
            .map(|f| f.path.to_string_lossy().into_owned())
            .collect();

        let df = match self.spec.format {
            FileFormat::Parquet => ctx.read_parquet(paths, ParquetReadOptions::default()).await,
            FileFormat::Csv => ctx.read_csv(paths, CsvReadOptions::new()).await,
            FileFormat::Json => ctx.read_json(paths, NdJsonReadOptions::default()).await,
        }
        .with_context(|| format!("Failed to read {} new file(s) from {}", files.len(), self.spec.path))?;

        Ok(df)
    }

    /// Record the batch schema on first run; report drift on later runs.
    ///
    /// Returns the names of columns that differ from the recorded schema.
    pub async fn record_schema(&self, schema: &DFSchema) -> Result<Vec<String>> {
        let columns: Vec<RecordedColumn> = schema
            .fields()
            .iter()
            .map(|field| RecordedColumn {
                name: field.name().clone(),
                data_type: field.data_type().to_string(),
            })
            .collect();

        let location = Path::new(&self.spec.schema_location);
        let path = location.join(SCHEMA_FILE);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let recorded: Vec<RecordedColumn> = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt schema file {}", path.display()))?;

                let drift: Vec<String> = columns
                    .iter()
                    .filter(|c| !recorded.contains(c))
                    .chain(recorded.iter().filter(|c| !columns.contains(c)))
                    .map(|c| c.name.clone())
                    .collect();

                if !drift.is_empty() {
                    tracing::warn!(
                        "Source {} schema differs from {}: {:?}",
                        self.spec.path,
                        path.display(),
                        drift
                    );
                }
                Ok(drift)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(location).await?;
                tokio::fs::write(&path, serde_json::to_vec_pretty(&columns)?)
                    .await
                    .with_context(|| format!("Failed to record schema at {}", path.display()))?;
                tracing::info!("Recorded {} source columns at {}", columns.len(), path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}
