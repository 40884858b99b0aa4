// Ingest Pipeline Model
//
// A run-once bronze -> silver pipeline: discover new source files, apply an
// ordered list of column transforms, optionally dedupe by key, and append
// the result to a silver table directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::table::FileFormat;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSpec {
    pub name: String,
    pub source: SourceSpec,
    #[serde(default)]
    pub transforms: Vec<Transform>,
    /// Key columns to dedupe on; empty disables deduplication
    #[serde(default)]
    pub dedupe_key: Vec<String>,
    pub sink: SinkSpec,
}

/// Where raw (bronze) files arrive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSpec {
    #[serde(default)]
    pub format: FileFormat,
    pub path: String,
    /// Directory where the inferred schema is recorded
    pub schema_location: String,
}

/// Where the cleaned (silver) table lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SinkSpec {
    /// Logical table name, e.g. `spotify_cata.silver.dimuser`
    pub table: String,
    /// Directory receiving parquet part files
    pub path: String,
    /// Directory holding the processed-file ledger
    pub checkpoint_location: String,
}

/// A single column transform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    /// Upper-case a string column in place
    Uppercase { column: String },
    /// Regex replace inside a string column
    Replace {
        column: String,
        pattern: String,
        replacement: String,
    },
    /// Label a numeric column by the first threshold it falls below
    Bucket {
        column: String,
        target: String,
        thresholds: Vec<Threshold>,
        otherwise: String,
    },
    /// Remove columns; columns that do not exist are ignored
    DropColumns { columns: Vec<String> },
    Rename { from: String, to: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Threshold {
    pub below: f64,
    pub label: String,
}

/// Outcome of one run-once pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub pipeline: String,
    pub table: String,
    pub files_processed: usize,
    pub rows_written: usize,
    /// Part file written by this run, if any rows were produced
    pub output_file: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// A pipeline that failed during a run-all
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunFailure {
    pub pipeline: String,
    pub error: String,
}

/// Outcome of running several pipelines: every success and every failure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunAllReport {
    pub summaries: Vec<RunSummary>,
    pub failures: Vec<RunFailure>,
}
