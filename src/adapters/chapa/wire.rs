//! Chapa request/response payloads and the verify-response normalizer.
//!
//! Chapa is loose with types: `amount` arrives as either a JSON number or a
//! string, and `message` is a string on most errors but an object on
//! validation errors. Everything optional here is optional on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, Money, Timestamp};
use crate::domain::purchase::{TxRef, VerificationResult, VerifiedPayment};

/// Body of `POST /v1/transaction/initialize`.
#[derive(Debug, Serialize)]
pub struct InitializeRequest<'a> {
    pub amount: String,
    pub currency: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub tx_ref: &'a str,
    pub callback_url: &'a str,
    pub return_url: &'a str,
    pub customization: Customization<'a>,
}

#[derive(Debug, Serialize)]
pub struct Customization<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

/// Outer envelope shared by every Chapa response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// Human-readable message, flattening object-shaped validation messages.
    pub fn message_text(&self) -> String {
        match &self.message {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    #[serde(default)]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tx_ref: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Chapa's own reference for the charge.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Reduce a raw verify response to a `VerificationResult`.
///
/// Only an explicit success or an explicit failure word leaves `Pending`.
pub fn normalize_verification(
    requested: &TxRef,
    http_status: u16,
    body: &str,
) -> VerificationResult {
    if http_status >= 500 {
        return VerificationResult::pending(format!("gateway returned {}", http_status));
    }

    // A proxy error page is not Chapa's answer, whatever its status code
    let envelope: Envelope<VerifyData> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return VerificationResult::pending(format!(
                "unparsable response ({}): {}",
                http_status, e
            ))
        }
    };

    if !(200..300).contains(&http_status) {
        if is_invalid_transaction(&envelope.message_text()) {
            return VerificationResult::failed(format!(
                "transaction unknown to gateway: {}",
                envelope.message_text()
            ));
        }
        return VerificationResult::pending(format!(
            "gateway returned {}: {}",
            http_status,
            envelope.message_text()
        ));
    }

    let message = envelope.message_text();
    let is_success = envelope.is_success();
    let data = match envelope.data {
        Some(data) => data,
        None => return VerificationResult::pending(format!("no data in response: {}", message)),
    };

    if let Some(reported) = data.tx_ref.as_deref() {
        if reported != requested.as_str() {
            return VerificationResult::pending(format!(
                "gateway answered for {} instead of {}",
                reported, requested
            ));
        }
    }

    match data.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("success") if is_success => match parse_amount(&data) {
            Some(amount) => VerificationResult::Success(VerifiedPayment {
                tx_ref: requested.clone(),
                amount,
                gateway_reference: data.reference.clone(),
                paid_at: data.updated_at.as_deref().and_then(parse_timestamp),
            }),
            None => VerificationResult::pending("success without a usable amount"),
        },
        Some(word @ ("failed" | "cancelled" | "reversed")) => {
            VerificationResult::failed(format!("gateway reported {}", word))
        }
        Some(other) => VerificationResult::pending(format!("gateway reported {}", other)),
        None => VerificationResult::pending("no status in response"),
    }
}

fn is_invalid_transaction(message: &str) -> bool {
    message.to_ascii_lowercase().contains("invalid transaction")
}

fn parse_amount(data: &VerifyData) -> Option<Money> {
    let raw = match data.amount.as_ref()? {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => return None,
    };
    let currency = match data.currency.as_deref() {
        Some(code) => Currency::new(code).ok()?,
        None => Currency::etb(),
    };
    Money::parse_decimal(&raw, currency).ok()
}

fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&chrono::Utc)))
}
