//! Application configuration, read from `MEETPOLL_*` environment variables
//! (a `.env` file is honoured).

use serde::Deserialize;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://meetpoll.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// sqlx connection string. Read from MEETPOLL_DATABASE_URL.
    pub database_url: String,
    /// Socket address the HTTP server listens on. Read from MEETPOLL_BIND_ADDR.
    pub bind_addr: String,
    /// Upper bound for the connection pool. Read from MEETPOLL_MAX_CONNECTIONS.
    pub max_connections: u32,
    /// Session lifetime measured from the last request. Read from MEETPOLL_SESSION_IDLE_SECS.
    pub session_idle_secs: i64,
    /// Mark the session cookie `Secure`; leave off for local HTTP.
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?
            .set_default("max_connections", 5)?
            .set_default("session_idle_secs", 3600)?
            .set_default("secure_cookies", false)?
            .add_source(config::Environment::with_prefix("MEETPOLL").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let cfg = AppConfig::load().unwrap();
        assert!(!cfg.database_url.is_empty());
        assert!(cfg.max_connections >= 1);
        assert!(cfg.session_idle_secs > 0);
    }
}
