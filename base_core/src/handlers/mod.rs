//! HTTP handlers

pub mod cache;
pub mod files;
pub mod health;
pub mod routes;

pub use routes::create_routes;
