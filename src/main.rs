use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use star_query::api::handlers::AppState;
use star_query::api::routes::create_router;
use star_query::config::Config;
use star_query::services::datafusion::DataFusionEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging (RUST_LOG wins over the configured level)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_ansi(config.logging.style != "never")
        .init();

    info!("Starting server on {}", config.server_address());

    // Register configured tables with the SQL engine
    let engine = DataFusionEngine::from_config(&config).await.map_err(|e| {
        error!("Failed to initialize SQL engine: {}", e);
        e
    })?;

    let addr: SocketAddr = config.server_address().parse()?;

    let state = AppState {
        config: Arc::new(config),
        engine: Arc::new(engine),
    };
    let app: Router = create_router(state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
