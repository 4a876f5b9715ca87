pub mod auth;
pub mod business;
pub mod config;
pub mod dashboard;
pub mod engagement;
pub mod error;
pub mod models;
pub mod openapi;
pub mod promotion;
pub mod rate_limit; // in-memory rate limiting
pub mod repo;
pub mod routes;

// Re-export commonly used items for tests / external users
pub use config::AppConfig;
pub use routes::{config, AppState};
