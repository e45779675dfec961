//! Layered configuration for the base services

pub mod settings;

pub use settings::*;
