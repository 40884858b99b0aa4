// DataFusion SQL Engine Module
//
// Executes assembled join queries over file-backed silver tables using
// Apache Arrow DataFusion 51.0.0:
// 1. Session configuration (default catalog/schema, batching, partitions)
// 2. Table registration from parquet/csv/json files or directories
// 3. Query execution with timeout and JSON row conversion

pub mod session; // DataFusionSessionManager
pub mod catalog; // DataFusionCatalogManager
pub mod executor; // DataFusionQueryExecutor
pub mod converter; // DataFusionResultConverter
pub mod engine; // SqlEngine trait + DataFusionEngine

// Re-exports for convenient access
pub use session::{DataFusionSessionManager, SessionConfig};
pub use catalog::DataFusionCatalogManager;
pub use executor::{DataFusionQueryExecutor, QueryExecutionResult};
pub use converter::DataFusionResultConverter;
pub use engine::{DataFusionEngine, SqlEngine};
