//! Chapa gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::chapa::{ChapaGatewayConfig, DEFAULT_BASE_URL};

/// Payment gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChapaConfig {
    /// Secret API key, `CHASECK_TEST-...` or `CHASECK-...`
    pub secret_key: SecretString,

    /// Shared secret for the `Chapa-Signature` webhook header. Callbacks are
    /// accepted unsigned when absent.
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Public URL of this service; callback and return URLs hang off it.
    pub app_base_url: String,
}

impl ChapaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_test_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("CHASECK_TEST")
    }

    /// Adapter settings derived from this section.
    pub fn gateway_config(&self) -> ChapaGatewayConfig {
        ChapaGatewayConfig::new(self.secret_key.clone())
            .with_base_url(self.base_url.clone())
            .with_timeout(self.timeout())
    }

    /// Validate gateway configuration
    ///
    /// Production requires an HTTPS `app_base_url`.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let key = self.secret_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("CINEGATE__CHAPA__SECRET_KEY"));
        }
        if !key.starts_with("CHASECK") {
            return Err(ValidationError::InvalidChapaKey);
        }
        if let Some(secret) = &self.webhook_secret {
            if secret.expose_secret().is_empty() {
                return Err(ValidationError::EmptyWebhookSecret);
            }
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.app_base_url.is_empty() {
            return Err(ValidationError::MissingRequired("CINEGATE__CHAPA__APP_BASE_URL"));
        }
        if *environment == Environment::Production && !self.app_base_url.starts_with("https://") {
            return Err(ValidationError::AppBaseUrlMustBeHttps);
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    15
}
