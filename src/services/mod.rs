pub mod assembler; // Join-query assembler
pub mod query_service;
pub mod datafusion; // DataFusion SQL engine
pub mod pipeline; // Run-once bronze -> silver ingest

pub use assembler::*;
pub use query_service::*;
