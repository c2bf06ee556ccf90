//! Application configuration module
//!
//! Loaded from environment variables with the `CINEGATE` prefix; nested
//! values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use cinegate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod chapa;
mod database;
mod error;
mod server;

pub use auth::AuthConfig;
pub use chapa::ChapaConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Host, port, environment, log filter
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Payment gateway credentials and public callback base
    pub chapa: ChapaConfig,

    /// Session token verification
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` when present, then every `CINEGATE__SECTION__KEY`
    /// variable:
    ///
    /// - `CINEGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CINEGATE__CHAPA__SECRET_KEY=...` -> `chapa.secret_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed into their expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CINEGATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic checks that deserialization cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.chapa.validate(&self.server.environment)?;
        self.auth.validate(&self.server.environment)?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
