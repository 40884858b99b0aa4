// DataFusion ResultConverter
//
// Converts executed RecordBatches into the JSON-row ResultTable returned by
// the API.

use anyhow::{Context, Result};
use datafusion::arrow::json::ArrayWriter;
use datafusion::arrow::record_batch::RecordBatch;
use serde_json::Value as JsonValue;

use super::executor::QueryExecutionResult;
use crate::models::ResultTable;

/// Converts DataFusion query results to JSON rows
pub struct DataFusionResultConverter;

impl DataFusionResultConverter {
    /// Convert an execution result into a ResultTable, one JSON object per row
    pub fn convert_to_result_table(result: QueryExecutionResult) -> Result<ResultTable> {
        let rows = Self::batches_to_json_rows(&result.batches)?;

        Ok(ResultTable {
            columns: result.columns,
            row_count: rows.len(),
            rows,
            execution_time_ms: result.execution_time_ms,
        })
    }

    /// Serialize batches through Arrow's JSON writer.
    ///
    /// NULL values are omitted from the row objects, as Arrow's writer does.
    fn batches_to_json_rows(batches: &[RecordBatch]) -> Result<Vec<JsonValue>> {
        if batches.iter().all(|batch| batch.num_rows() == 0) {
            return Ok(Vec::new());
        }

        let mut writer = ArrayWriter::new(Vec::new());
        let refs: Vec<&RecordBatch> = batches.iter().collect();
        writer
            .write_batches(&refs)
            .context("Failed to serialize result batches")?;
        writer.finish().context("Failed to finish JSON result")?;

        let buffer = writer.into_inner();
        serde_json::from_slice(&buffer).context("Failed to read serialized result rows")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use serde_json::json;
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Int64, false),
            Field::new("user_name", DataType::Utf8, true),
        ]));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("ADA"), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_convert_rows() {
        let result = QueryExecutionResult::from_batches(
            vec!["user_id".to_string(), "user_name".to_string()],
            vec![batch()],
            5,
        );

        let table = DataFusionResultConverter::convert_to_result_table(result).unwrap();
        assert_eq!(table.row_count, 2);
        assert_eq!(table.rows[0], json!({"user_id": 1, "user_name": "ADA"}));
        assert_eq!(table.rows[1], json!({"user_id": 2}));
        assert_eq!(table.execution_time_ms, 5);
    }

    #[test]
    fn test_convert_empty_result() {
        let result = QueryExecutionResult::from_batches(vec!["user_id".to_string()], vec![], 0);

        let table = DataFusionResultConverter::convert_to_result_table(result).unwrap();
        assert_eq!(table.row_count, 0);
        assert!(table.rows.is_empty());
        assert_eq!(table.columns, vec!["user_id".to_string()]);
    }
}
