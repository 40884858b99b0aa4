// DataFusion QueryExecutor
//
// Plans and executes assembled SQL with timeout support.

use anyhow::{anyhow, Context, Result};
use datafusion::arrow::array::RecordBatch;
use datafusion::prelude::*;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Query execution result containing record batches
pub struct QueryExecutionResult {
    /// Output column names, in projection order
    pub columns: Vec<String>,
    /// Result data as record batches
    pub batches: Vec<RecordBatch>,
    /// Number of rows returned
    pub row_count: usize,
    /// Execution time in milliseconds
    pub execution_time_ms: u128,
}

impl QueryExecutionResult {
    /// Create a new result from record batches
    pub fn from_batches(columns: Vec<String>, batches: Vec<RecordBatch>, execution_time_ms: u128) -> Self {
        let row_count = batches.iter().map(|batch| batch.num_rows()).sum();

        Self {
            columns,
            batches,
            row_count,
            execution_time_ms,
        }
    }
}

/// Executes DataFusion queries with timeout and error handling
pub struct DataFusionQueryExecutor {
    /// Session context for query execution
    ctx: SessionContext,
    /// Default timeout for queries
    default_timeout: Duration,
}

impl DataFusionQueryExecutor {
    pub fn new(ctx: SessionContext, default_timeout: Duration) -> Self {
        Self {
            ctx,
            default_timeout,
        }
    }

    /// Execute a SQL query with the default timeout
    pub async fn execute_query(&self, sql: &str) -> Result<QueryExecutionResult> {
        self.execute_query_with_timeout(sql, self.default_timeout).await
    }

    /// Execute a SQL query with a custom timeout
    ///
    /// # Errors
    /// Returns error if planning fails, execution fails, or timeout occurs
    pub async fn execute_query_with_timeout(
        &self,
        sql: &str,
        timeout_duration: Duration,
    ) -> Result<QueryExecutionResult> {
        let start_time = Instant::now();

        let (columns, batches) = timeout(timeout_duration, async {
            let df = self
                .ctx
                .sql(sql)
                .await
                .context("Failed to plan SQL query")?;

            let columns: Vec<String> = df
                .schema()
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect();

            let batches = df.collect().await.context("Failed to execute query plan")?;

            Ok::<_, anyhow::Error>((columns, batches))
        })
        .await
        .map_err(|_| anyhow!("Query execution timeout after {:?}", timeout_duration))??;

        Ok(QueryExecutionResult::from_batches(
            columns,
            batches,
            start_time.elapsed().as_millis(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_query_execution() {
        let executor = DataFusionQueryExecutor::new(SessionContext::new(), Duration::from_secs(30));

        let result = executor
            .execute_query("SELECT 1 AS num, 'hello' AS text")
            .await
            .unwrap();

        assert_eq!(result.row_count, 1);
        assert_eq!(result.columns, vec!["num".to_string(), "text".to_string()]);
    }

    #[tokio::test]
    async fn test_left_join_keeps_unmatched_rows() {
        let executor = DataFusionQueryExecutor::new(SessionContext::new(), Duration::from_secs(30));
        let sql = "SELECT f.id, u.name \
                   FROM (VALUES (1, 10), (2, 20)) AS f(id, user_id) \
                   LEFT JOIN (VALUES (10, 'ada')) AS u(user_id, name) ON f.user_id = u.user_id";

        let result = executor.execute_query(sql).await.unwrap();
        assert_eq!(result.row_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_table_fails() {
        let executor = DataFusionQueryExecutor::new(SessionContext::new(), Duration::from_secs(30));

        let result = executor.execute_query("SELECT * FROM dimuser").await;
        let err = result.err().unwrap();
        assert!(format!("{:#}", err).contains("dimuser"));
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let executor = DataFusionQueryExecutor::new(SessionContext::new(), Duration::from_millis(1));

        // May or may not time out depending on system speed, but should not crash
        match executor.execute_query("SELECT 1").await {
            Ok(_) => {}
            Err(e) => {
                let message = e.to_string();
                assert!(message.contains("timeout") || message.contains("Timeout"));
            }
        }
    }
}
