//! Main entry point for the HTTP server binary

use anyhow::{Context, Result};
use base_core::{
    config::{LogFormat, LoggingConfig},
    create_app, run_server, AppState, BaseConfig,
};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = BaseConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());
    info!(
        "Storage provider: {} at {}",
        config.storage.provider,
        config.storage.base_path.display()
    );

    config
        .create_directories()
        .context("Failed to create storage directories")?;

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address()))?;

    let state = AppState::from_config(&config).context("Failed to initialise application state")?;
    state
        .storage_manager
        .get_default_storage()
        .context("Failed to initialise default storage provider")?;

    info!("App: {} v{}", state.app_name, state.version);

    let app = create_app(state);
    run_server(app, addr, config.shutdown_timeout()).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},base_core={level},tower_http=debug,axum=info",
            env!("CARGO_CRATE_NAME"),
            level = logging.level
        )
        .into()
    });

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.pretty())
            .init(),
    }
}
