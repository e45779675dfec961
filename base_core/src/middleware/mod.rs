//! Middleware components for the HTTP facade

pub mod auth;
pub mod logging;

pub use auth::{jwt_auth_middleware, require_admin};
pub use logging::logging_layer;
