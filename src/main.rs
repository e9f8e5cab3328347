use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use storefront_orders::{create_api_router, AppContext, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            process::exit(1);
        }
    };

    let ctx = match AppContext::from_config(&config).await {
        Ok(ctx) => ctx,
        Err(err) => {
            error!(error = %err, "Failed to start");
            process::exit(1);
        }
    };

    let app = create_api_router(ctx);

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(port = config.port, error = %err, "Failed to bind");
            process::exit(1);
        }
    };
    info!(port = config.port, "API listening");

    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "Server stopped");
        process::exit(1);
    }
}
