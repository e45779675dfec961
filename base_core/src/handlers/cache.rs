//! Cache administration handlers

use axum::{extract::State, http::StatusCode, Json};
use std::collections::HashMap;
use tracing::info;

use crate::{cache::CacheStats, models::ApiResponse, AppState};

pub async fn get_cache_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<HashMap<String, CacheStats>>> {
    Json(ApiResponse::success(state.cache_manager.stats()))
}

pub async fn clear_caches(State(state): State<AppState>) -> StatusCode {
    state.cache_manager.clear_all();
    info!("Cleared all caches");
    StatusCode::NO_CONTENT
}
