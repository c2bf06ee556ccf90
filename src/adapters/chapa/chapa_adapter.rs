//! Chapa payment gateway adapter.
//!
//! Implements `PaymentGateway` against the Chapa REST API.
//!
//! # Failure handling
//!
//! - `initiate`: transport errors, timeouts, 5xx and 429 are `Unavailable`;
//!   other 4xx and success bodies without a checkout URL are `Rejected`
//! - `verify`: never errors; anything short of an explicit answer is
//!   `Pending` (see [`normalize_verification`])
//!
//! # Configuration
//!
//! ```ignore
//! let config = ChapaGatewayConfig::new(secret_key).with_timeout(Duration::from_secs(15));
//! let gateway = ChapaGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::purchase::{TxRef, VerificationResult};
use crate::ports::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway};

use super::wire::{
    normalize_verification, Customization, Envelope, InitializeData, InitializeRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.chapa.co";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the Chapa API.
#[derive(Clone)]
pub struct ChapaGatewayConfig {
    /// Secret API key (CHASECK_TEST-... or CHASECK-...).
    secret_key: SecretString,

    /// Base URL, without the `/v1` suffix.
    api_base_url: String,

    /// Client-side request timeout for both endpoints.
    timeout: Duration,
}

impl ChapaGatewayConfig {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ChapaGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapaGatewayConfig")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Chapa hosted-checkout gateway.
pub struct ChapaGateway {
    config: ChapaGatewayConfig,
    http_client: reqwest::Client,
}

impl ChapaGateway {
    /// Build the adapter with a client that enforces the configured timeout.
    pub fn new(config: ChapaGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::unavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    async fn initiate(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let body = InitializeRequest {
            amount: request.amount.to_decimal_string(),
            currency: request.amount.currency.as_str(),
            email: &request.payer.email,
            first_name: &request.payer.first_name,
            last_name: &request.payer.last_name,
            tx_ref: request.tx_ref.as_str(),
            callback_url: &request.callback_url,
            return_url: &request.return_url,
            customization: Customization {
                title: &request.title,
                description: &request.description,
            },
        };

        let response = self
            .http_client
            .post(self.url("transaction/initialize"))
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    tx_ref = %request.tx_ref,
                    error = %e,
                    "Chapa initialize unreachable"
                );
                GatewayError::unavailable(e.to_string())
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let envelope: Option<Envelope<InitializeData>> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = envelope
                .as_ref()
                .map(Envelope::message_text)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Chapa returned {}", status));
            tracing::error!(
                tx_ref = %request.tx_ref,
                http_status = status.as_u16(),
                error = %message,
                "Chapa initialize failed"
            );
            return Err(GatewayError::from_status(status.as_u16(), message));
        }

        let envelope = envelope
            .ok_or_else(|| GatewayError::rejected("Failed to parse Chapa response"))?;
        let message = envelope.message_text();
        if !envelope.is_success() {
            return Err(GatewayError::rejected(if message.is_empty() {
                "Chapa did not accept the payment".to_string()
            } else {
                message
            }));
        }

        let checkout_url = envelope
            .data
            .and_then(|d| d.checkout_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::rejected("Chapa response has no checkout_url"))?;

        tracing::info!(tx_ref = %request.tx_ref, "Chapa checkout created");
        Ok(CheckoutSession { checkout_url })
    }

    async fn verify(&self, tx_ref: &TxRef) -> VerificationResult {
        let response = match self
            .http_client
            .get(self.url(&format!("transaction/verify/{}", tx_ref)))
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(tx_ref = %tx_ref, error = %e, "Chapa verify unreachable");
                return VerificationResult::pending(format!("gateway unreachable: {}", e));
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return VerificationResult::pending(format!("body read failed: {}", e)),
        };

        let result = normalize_verification(tx_ref, status, &body);
        tracing::debug!(
            tx_ref = %tx_ref,
            http_status = status,
            outcome = result.label(),
            "Chapa verify"
        );
        result
    }
}
