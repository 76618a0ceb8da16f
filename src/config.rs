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
    pub federation: FederationConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8088)
    pub port: u16,
    /// Public domain (e.g., "status.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://status.example.com"
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

/// Federation configuration
///
/// Bounds for outbound hub traffic. Hub pings and subscribe requests share
/// the same timeout; a hub that exceeds it counts as a failed delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Per-hub request timeout in seconds (default: 5)
    pub hub_timeout_seconds: u64,
    /// Maximum concurrent hub notifications per publish (default: 10)
    pub max_concurrent_pings: usize,
    /// Hub endpoints advertised on (and pinged for) locally authored feeds
    #[serde(default)]
    pub hubs: Vec<String>,
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
    /// 4. Environment variables (TIDEPOOL_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8088)?
            .set_default("server.protocol", "http")?
            .set_default("federation.hub_timeout_seconds", 5)?
            .set_default("federation.max_concurrent_pings", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (TIDEPOOL_*)
            .add_source(
                Environment::with_prefix("TIDEPOOL")
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
        if !matches!(self.server.protocol.as_str(), "http" | "https") {
            return Err(crate::error::AppError::Config(format!(
                "server.protocol must be \"http\" or \"https\", got {:?}",
                self.server.protocol
            )));
        }

        if self.server.domain.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "server.domain must not be empty".to_string(),
            ));
        }

        if self.federation.hub_timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "federation.hub_timeout_seconds must be at least 1".to_string(),
            ));
        }

        if self.federation.max_concurrent_pings == 0 {
            return Err(crate::error::AppError::Config(
                "federation.max_concurrent_pings must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
