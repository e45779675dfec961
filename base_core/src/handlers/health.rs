//! Health check handler

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::{debug, warn};

use crate::{models::ApiResponse, AppState};

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("GET /health");

    let storage_status = match state.storage_manager.get_default_storage() {
        Ok(_) => "healthy",
        Err(e) => {
            warn!("Default storage provider is unavailable: {}", e);
            "unhealthy"
        }
    };

    Json(ApiResponse::success(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "app": state.app_name,
        "version": state.version,
        "storage": {
            "status": storage_status,
            "default_provider": state.storage_manager.default_provider(),
            "providers": state.storage_manager.provider_names(),
            "registered": state.storage_manager.storage_count(),
        },
        "cache": {
            "provider": state.cache_manager.provider(),
            "caches": state.cache_manager.cache_names(),
        },
    })))
}
