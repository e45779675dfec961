//! Core library: file storage providers, JWT security, caching and the HTTP
//! facade that ties them together.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod storage;

pub use cache::{Cache, CacheExt, CacheManager, CacheStats, MemoryCache};
pub use config::BaseConfig;
pub use error::{BaseError, Result};
pub use handlers::create_routes;
pub use security::{
    AuthenticationRequest, CredentialKind, JwtAuthenticationManager, JwtAuthorizationChecker,
    JwtClaims, JwtTokenService, Principal,
};
pub use storage::{
    AsyncFileStorage, FileMetadata, FileStorage, FileStorageManager, LocalFileStorage,
};

use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub storage_manager: FileStorageManager,
    pub authentication: JwtAuthenticationManager,
    pub authorization: JwtAuthorizationChecker,
    pub cache_manager: CacheManager,
    pub max_list_results: i64,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &BaseConfig) -> Result<Self> {
        Ok(Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage_manager: FileStorageManager::from_config(&config.storage),
            authentication: JwtAuthenticationManager::from_config(&config.security)?,
            authorization: JwtAuthorizationChecker::default(),
            cache_manager: CacheManager::new(config.cache.clone())?,
            max_list_results: config.storage.max_list_results,
            max_upload_bytes: config.storage.max_upload_bytes,
        })
    }

    /// The configured default provider wrapped for async use.
    pub fn default_storage(&self) -> Result<AsyncFileStorage> {
        self.storage_manager
            .get_default_storage()
            .map(AsyncFileStorage::new)
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes(&state))
        .layer(middleware::logging::logging_layer())
        .with_state(state)
}

/// Serves `app` until Ctrl+C or SIGTERM, then gives in-flight requests up to
/// `shutdown_timeout` to finish.
pub async fn run_server(app: Router, addr: SocketAddr, shutdown_timeout: Duration) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let (signal_tx, signal_rx) = oneshot::channel();

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signal_tx.send(());
    });
    let mut server = tokio::spawn(serve.into_future());

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| BaseError::Internal(format!("Server task failed: {}", e)))??;
            return Ok(());
        }
        _ = signal_rx => {}
    }

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => {
            result.map_err(|e| BaseError::Internal(format!("Server task failed: {}", e)))??;
            info!("Server stopped");
        }
        Err(_) => warn!(
            "In-flight requests still running after {:?}, stopping anyway",
            shutdown_timeout
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
