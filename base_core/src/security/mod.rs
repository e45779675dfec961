pub mod authentication;
pub mod authorization;
pub mod jwt;
pub mod models;


pub use authentication::*;
pub use authorization::*;
pub use jwt::*;
pub use models::*;
