pub mod pipeline;
pub mod query;

use std::sync::Arc;

use crate::config::Config;
use crate::services::datafusion::SqlEngine;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<dyn SqlEngine>,
}
