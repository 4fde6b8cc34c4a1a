//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "anime.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://anime.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Staff bootstrap configuration
///
/// When a password is configured and the username is free, a superuser
/// account is created at startup so the help chat has a staff side.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Staff username (default: "admin")
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// Staff password; no account is created when unset
    pub password: Option<String>,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

/// Long-poll feed configuration
///
/// Timings are configurable so tests can exercise the timeout path in
/// milliseconds instead of the production 25 seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Hard per-request timeout in milliseconds (default: 25000)
    pub timeout_ms: u64,
    /// Comment feed retry interval in milliseconds (default: 200)
    pub comment_interval_ms: u64,
    /// Chat feed retry interval in milliseconds (default: 500)
    pub chat_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (TAKOSU_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/takosu.db")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("admin.username", "admin")?
            .set_default("polling.timeout_ms", 25_000)?
            .set_default("polling.comment_interval_ms", 200)?
            .set_default("polling.chat_interval_ms", 500)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (TAKOSU_*)
            .add_source(
                Environment::with_prefix("TAKOSU")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.polling.timeout_ms == 0 {
            return Err(crate::error::AppError::Config(
                "polling.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.polling.comment_interval_ms == 0 || self.polling.chat_interval_ms == 0 {
            return Err(crate::error::AppError::Config(
                "polling intervals must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
