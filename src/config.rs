//! Startup configuration, loaded once from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::rate_limit::RateLimitConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Local front-ends: admin panel, business-owner client, public site.
const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub frontend_origins: Vec<String>,
    pub bootstrap_admin_emails: Vec<String>,
    pub rate_limits_enabled: bool,
    pub rate_limits: RateLimitConfig,
}

fn csv(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env is a development convenience only
        if cfg!(debug_assertions) {
            let _ = dotenv::dotenv();
        }

        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue("JWT_SECRET", format!("must be at least {MIN_SECRET_LEN} characters")));
        }

        let bind = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_address = bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS", e.to_string()))?;

        let frontend_origins = match std::env::var("FRONTEND_URLS") {
            Ok(v) => csv(&v),
            Err(_) => DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let rate_limits_enabled = std::env::var("RL_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            bind_address,
            database_url: std::env::var("DATABASE_URL").ok(),
            data_dir: std::env::var("STOREFRONT_DATA_DIR").ok().map(PathBuf::from),
            frontend_origins,
            bootstrap_admin_emails: std::env::var("BOOTSTRAP_ADMIN_EMAILS")
                .map(|v| csv(&v).into_iter().map(|e| e.to_lowercase()).collect())
                .unwrap_or_default(),
            rate_limits_enabled,
            rate_limits: RateLimitConfig::from_env(),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::MissingVar("DATABASE_URL"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_drops_blanks() {
        assert_eq!(csv(" a@x.io, ,b@x.io,"), vec!["a@x.io".to_string(), "b@x.io".to_string()]);
    }
}
