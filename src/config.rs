use serde::Deserialize;
use std::env;

use crate::models::{PipelineSpec, QueryLayout, TableDescriptor, TableRegistration};

/// Environment variable naming an optional config file (TOML, JSON or YAML)
pub const CONFIG_FILE_ENV: &str = "STAR_QUERY_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub query: QueryConfig,
    #[serde(default)]
    pub tables: Vec<TableRegistration>,
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Default catalog for unqualified and three-part table names
    pub catalog: String,
    /// Default schema inside `catalog`
    pub schema: String,
    pub batch_size: usize,
    /// 0 means one partition per CPU
    pub target_partitions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Reject descriptor lists with duplicate aliases before execution
    pub strict_aliases: bool,
    pub layout: QueryLayout,
    /// Descriptors used when a request does not supply its own
    #[serde(default)]
    pub descriptors: Vec<TableDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

impl Config {
    /// Load defaults, the optional `STAR_QUERY_CONFIG` file and environment overrides
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let file = env::var(CONFIG_FILE_ENV).ok();
        Self::load(file.as_deref())
    }

    /// Load defaults, then `file` (if any), then environment overrides
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("engine.catalog", "datafusion")?
            .set_default("engine.schema", "public")?
            .set_default("engine.batch_size", 8192)?
            .set_default("engine.target_partitions", 0)?
            .set_default("engine.timeout_secs", 30)?
            .set_default("query.strict_aliases", true)?
            .set_default("query.layout", "compact")?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path));
        }

        if let Ok(host) = env::var("HOST") {
            builder = builder.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port.parse::<u16>().unwrap_or(3000))?;
        }

        if let Ok(catalog) = env::var("STAR_QUERY_CATALOG") {
            builder = builder.set_override("engine.catalog", catalog)?;
        }

        if let Ok(schema) = env::var("STAR_QUERY_SCHEMA") {
            builder = builder.set_override("engine.schema", schema)?;
        }

        if let Ok(timeout) = env::var("STAR_QUERY_TIMEOUT_SECS") {
            builder = builder.set_override("engine.timeout_secs", timeout.parse::<u64>().unwrap_or(30))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Look up a configured pipeline by name
    pub fn pipeline(&self, name: &str) -> Option<&PipelineSpec> {
        self.pipelines.iter().find(|p| p.name == name)
    }
}
