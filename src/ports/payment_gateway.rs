//! Payment gateway port.
//!
//! Two operations: start a hosted checkout, and ask what happened to it.
//!
//! # Design
//!
//! - **No automatic retries**: `initiate` reports failures, the caller decides
//! - **Verification cannot fail**: `verify` returns a `VerificationResult`
//!   rather than a `Result`. Transport trouble and ambiguous answers are
//!   `Pending` by construction, so they can never be mistaken for `Failed`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Money;
use crate::domain::purchase::{PurchaseError, TxRef, VerificationResult};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout for `request.tx_ref`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` on network failure, timeout or 5xx
    /// - `Rejected` on 4xx or a response without a checkout URL
    async fn initiate(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError>;

    /// Ask the gateway for the outcome of `tx_ref`.
    async fn verify(&self, tx_ref: &TxRef) -> VerificationResult;
}

/// Person paying, as the hosted checkout page shows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Payer {
    /// Splits a display name at the first space; "User" when there is none.
    pub fn from_display_name(email: impl Into<String>, display_name: Option<&str>) -> Self {
        let name = display_name.map(str::trim).unwrap_or("");
        let (first, last) = match name.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.trim().to_string()),
            None if !name.is_empty() => (name.to_string(), String::new()),
            None => ("User".to_string(), String::new()),
        };
        Self {
            email: email.into(),
            first_name: first,
            last_name: last,
        }
    }
}

/// Request to open a hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub tx_ref: TxRef,
    pub amount: Money,
    pub payer: Payer,
    /// Where the gateway POSTs/GETs its asynchronous notification.
    pub callback_url: String,
    /// Where the browser lands after checkout.
    pub return_url: String,
    pub title: String,
    pub description: String,
}

/// Hosted checkout created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

/// Categorization of gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayErrorCode {
    /// Network failure, timeout, or 5xx.
    Unavailable,
    /// 4xx or a structurally unusable success response.
    Rejected,
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayErrorCode::Unavailable => write!(f, "gateway_unavailable"),
            GatewayErrorCode::Rejected => write!(f, "gateway_rejected"),
        }
    }
}

/// Error from `PaymentGateway::initiate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// HTTP status returned by the provider, if one was received.
    pub http_status: Option<u16>,
}

impl GatewayError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            code: GatewayErrorCode::Unavailable,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            code: GatewayErrorCode::Rejected,
            message: message.into(),
            http_status: None,
        }
    }

    /// Classify an HTTP error status: 5xx and 429 are unavailable, other 4xx rejected.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let code = if status >= 500 || status == 429 {
            GatewayErrorCode::Unavailable
        } else {
            GatewayErrorCode::Rejected
        };
        Self {
            code,
            message: message.into(),
            http_status: Some(status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code == GatewayErrorCode::Unavailable
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for PurchaseError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::Unavailable => PurchaseError::gateway_unavailable(err.message),
            GatewayErrorCode::Rejected => PurchaseError::gateway_rejected(err.message),
        }
    }
}
