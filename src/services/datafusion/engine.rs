// SQL engine abstraction
//
// Assembled queries are handed verbatim to an engine; this module defines
// that seam and the DataFusion implementation behind it.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

use super::catalog::DataFusionCatalogManager;
use super::converter::DataFusionResultConverter;
use super::executor::DataFusionQueryExecutor;
use super::session::{DataFusionSessionManager, SessionConfig};
use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::{ResultTable, TableRegistration};

/// SQL execution engine - evaluates query text against registered tables
#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Execute a query and return its rows
    async fn execute(&self, sql: &str) -> Result<ResultTable, AppError>;

    /// Make a table visible to subsequent queries, replacing any previous one
    async fn register_table(&self, registration: &TableRegistration) -> Result<(), AppError>;

    /// Names of tables in the default schema
    async fn list_tables(&self) -> Result<Vec<String>, AppError>;

    /// Engine name for logging
    fn engine_name(&self) -> &str;
}

/// DataFusion-backed engine over file tables
pub struct DataFusionEngine {
    catalog: Mutex<DataFusionCatalogManager>,
    executor: DataFusionQueryExecutor,
}

impl DataFusionEngine {
    pub fn new(session: SessionConfig, timeout: Duration) -> Result<Self, AppError> {
        let ctx = DataFusionSessionManager::new(session).create_session()?;

        Ok(Self {
            executor: DataFusionQueryExecutor::new(ctx.clone(), timeout),
            catalog: Mutex::new(DataFusionCatalogManager::new(ctx)),
        })
    }

    /// Build the engine from configuration and register every configured table.
    ///
    /// Tables that cannot be read yet are skipped with a warning.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let engine = Self::new(
            SessionConfig::from(&config.engine),
            Duration::from_secs(config.engine.timeout_secs),
        )?;

        let skipped = engine
            .catalog
            .lock()
            .await
            .register_all(&config.tables)
            .await;

        tracing::info!(
            "SQL engine ready: {} table(s) registered, {} skipped",
            config.tables.len() - skipped.len(),
            skipped.len()
        );

        Ok(engine)
    }
}

#[async_trait]
impl SqlEngine for DataFusionEngine {
    async fn execute(&self, sql: &str) -> Result<ResultTable, AppError> {
        tracing::debug!("Executing on DataFusion: {}", sql);

        let result = self
            .executor
            .execute_query(sql)
            .await
            .map_err(|e| AppError::Database(format!("{:#}", e)))?;

        Ok(DataFusionResultConverter::convert_to_result_table(result)?)
    }

    async fn register_table(&self, registration: &TableRegistration) -> Result<(), AppError> {
        self.catalog
            .lock()
            .await
            .register(registration)
            .await
            .map_err(|e| AppError::Database(format!("{:#}", e)))
    }

    async fn list_tables(&self) -> Result<Vec<String>, AppError> {
        Ok(self.catalog.lock().await.list_tables()?)
    }

    fn engine_name(&self) -> &str {
        "datafusion"
    }
}
