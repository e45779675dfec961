//! Route table for the HTTP facade

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use super::{cache, files, health};
use crate::middleware::auth::{jwt_auth_middleware, require_admin};
use crate::AppState;

pub fn create_routes(state: &AppState) -> Router<AppState> {
    let file_routes = Router::new()
        .route("/api/files", get(files::list_files))
        .route(
            "/api/files/*file_id",
            get(files::download_file)
                .put(files::upload_file)
                .delete(files::delete_file)
                .head(files::file_exists),
        )
        .route("/api/metadata/*file_id", get(files::get_metadata))
        .route("/api/copy", post(files::copy_file))
        .route("/api/me", get(files::current_principal))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let admin_routes = Router::new()
        .route(
            "/api/admin/cache",
            get(cache::get_cache_stats).delete(cache::clear_caches),
        )
        .route_layer(middleware::from_fn(require_admin));

    let protected = file_routes
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/health", get(health::handle_health))
        .merge(protected)
}
