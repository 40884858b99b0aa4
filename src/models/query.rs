use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::descriptor::TableDescriptor;

/// Whitespace layout of an assembled query
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryLayout {
    /// Everything on one line
    #[default]
    Compact,
    /// One clause per line, one column fragment per indented line
    Pretty,
}

/// An assembled query and the lifecycle of its execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub query_text: String,
    pub status: QueryStatus,
    pub result: Option<ResultTable>,
    pub error_message: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl Query {
    pub fn new(query_text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query_text,
            status: QueryStatus::Pending,
            result: None,
            error_message: None,
            executed_at: None,
        }
    }

    pub fn mark_executing(&mut self) {
        self.status = QueryStatus::Executing;
    }

    pub fn mark_completed(&mut self, result: ResultTable) {
        self.status = QueryStatus::Completed;
        self.result = Some(result);
        self.executed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error_message: String) {
        self.status = QueryStatus::Failed;
        self.error_message = Some(error_message);
        self.executed_at = Some(Utc::now());
    }
}

/// Rows returned by the SQL engine, one JSON object per row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
    pub row_count: usize,
    pub execution_time_ms: u128,
}

#[derive(Debug, Deserialize)]
pub struct AssembleRequest {
    pub descriptors: Vec<TableDescriptor>,
    #[serde(default)]
    pub layout: QueryLayout,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssembleResponse {
    pub query: String,
    pub table_count: usize,
}

/// Execute request; falls back to the configured descriptors when none are given
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub descriptors: Option<Vec<TableDescriptor>>,
    #[serde(default)]
    pub layout: QueryLayout,
}
