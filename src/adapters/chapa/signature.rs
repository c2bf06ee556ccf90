//! Chapa webhook signature verification.
//!
//! Chapa signs the raw request body with HMAC-SHA256 keyed by the webhook
//! secret and sends the hex digest in `Chapa-Signature` (older integrations
//! use `x-chapa-signature`). There is no timestamp to check, so the callback
//! must stay idempotent against replays.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header names Chapa uses for the body signature, preferred first.
pub const SIGNATURE_HEADERS: [&str; 2] = ["chapa-signature", "x-chapa-signature"];

/// Why a webhook signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,

    #[error("signature is not valid hex")]
    Malformed,

    #[error("signature mismatch")]
    Mismatch,
}

/// Checks `provided` (hex) against HMAC-SHA256(secret, body) in constant time.
pub fn verify_webhook_signature(
    secret: &SecretString,
    body: &[u8],
    provided: Option<&str>,
) -> Result<(), SignatureError> {
    let provided = provided
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::Missing)?;
    let provided = hex_decode(provided).ok_or(SignatureError::Malformed)?;

    let expected = sign(secret, body);
    if expected.ct_eq(provided.as_slice()).unwrap_u8() != 1 {
        tracing::warn!("Invalid Chapa webhook signature");
        return Err(SignatureError::Mismatch);
    }
    Ok(())
}

fn sign(secret: &SecretString, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length; new_from_slice cannot fail for Sha256.
    let mut mac = match HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Lower-case hex digest of HMAC-SHA256(secret, body). Used by tests and
/// local tooling to produce valid callbacks.
pub fn sign_hex(secret: &SecretString, body: &[u8]) -> String {
    hex_encode(&sign(secret, body))
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::new("whsec-test".to_string())
    }

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"tx_ref":"tx_1_abc"}"#;
        let signature = sign_hex(&secret(), body);
        assert!(verify_webhook_signature(&secret(), body, Some(&signature)).is_ok());
    }

    #[test]
    fn accepts_uppercase_hex() {
        let body = b"payload";
        let signature = sign_hex(&secret(), body).to_uppercase();
        assert!(verify_webhook_signature(&secret(), body, Some(&signature)).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign_hex(&secret(), b"original");
        assert_eq!(
            verify_webhook_signature(&secret(), b"tampered", Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_missing_and_malformed() {
        assert_eq!(
            verify_webhook_signature(&secret(), b"x", None),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_webhook_signature(&secret(), b"x", Some("zz")),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_webhook_signature(&secret(), b"x", Some("abc")),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn hex_encode_is_lowercase() {
        assert_eq!(hex_encode(&[0x00, 0xab, 0xff]), "00abff");
    }
}
