// DataFusion SessionManager
//
// Creates SessionContext instances configured for the star schema: a default
// catalog/schema pair so that three-part names such as
// `spotify_cata.silver.dimuser` resolve, plus batch size and partitioning.

use anyhow::Result;
use datafusion::prelude::{SessionConfig as DataFusionConfig, SessionContext};

use crate::config::EngineConfig;

/// Configuration for DataFusion sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Number of partitions for parallel execution
    pub target_partitions: usize,
    /// Catalog that unqualified and three-part names resolve against
    pub default_catalog: String,
    /// Schema inside `default_catalog`
    pub default_schema: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            default_catalog: "datafusion".to_string(),
            default_schema: "public".to_string(),
        }
    }
}

impl From<&EngineConfig> for SessionConfig {
    fn from(config: &EngineConfig) -> Self {
        let target_partitions = if config.target_partitions == 0 {
            num_cpus::get()
        } else {
            config.target_partitions
        };

        Self {
            batch_size: config.batch_size,
            target_partitions,
            default_catalog: config.catalog.clone(),
            default_schema: config.schema.clone(),
        }
    }
}

/// Manages DataFusion SessionContext lifecycle
///
/// # Example
/// ```rust,ignore
/// let manager = DataFusionSessionManager::new(SessionConfig::default());
/// let session = manager.create_session()?;
/// let df = session.sql("SELECT * FROM dimuser").await?;
/// ```
pub struct DataFusionSessionManager {
    config: SessionConfig,
}

impl DataFusionSessionManager {
    /// Create a new SessionManager with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Create a new DataFusion SessionContext.
    ///
    /// The default catalog and schema are created if they do not exist yet.
    pub fn create_session(&self) -> Result<SessionContext> {
        let config = DataFusionConfig::new()
            .with_batch_size(self.config.batch_size)
            .with_target_partitions(self.config.target_partitions)
            .with_create_default_catalog_and_schema(true)
            .with_default_catalog_and_schema(
                self.config.default_catalog.as_str(),
                self.config.default_schema.as_str(),
            );

        Ok(SessionContext::new_with_config(config))
    }
}
