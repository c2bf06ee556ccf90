//! Transaction reference shared with the payment gateway.
//!
//! Format: `<prefix>_<unix-millis>_<suffix>` where prefix is `tx` for movie
//! purchases and `sub` for subscriptions, and the suffix is twelve base36
//! characters drawn from a v4 UUID.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{Timestamp, ValidationError};

use super::SubjectType;

const SUFFIX_LEN: usize = 12;
const MAX_LEN: usize = 64;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Externally visible, immutable purchase-attempt reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxRef(String);

impl TxRef {
    /// Generates a fresh reference for a new purchase attempt.
    pub fn generate(kind: SubjectType, now: Timestamp) -> Self {
        let prefix = match kind {
            SubjectType::Movie => "tx",
            SubjectType::Subscription => "sub",
        };
        Self(format!(
            "{}_{}_{}",
            prefix,
            now.as_unix_millis(),
            random_suffix()
        ))
    }

    /// Accepts an inbound reference (callback, query string, admin input).
    ///
    /// Only `[A-Za-z0-9_-]`, 1 to 64 characters. References created by
    /// other systems are allowed as long as they fit that shape.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, ValidationError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(ValidationError::empty_field("tx_ref"));
        }
        if input.len() > MAX_LEN {
            return Err(ValidationError::invalid_format(
                "tx_ref",
                format!("longer than {} characters", MAX_LEN),
            ));
        }
        if !input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::invalid_format(
                "tx_ref",
                "only letters, digits, '_' and '-' are allowed",
            ));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The subject kind encoded in the prefix, if this is one of ours.
    pub fn kind(&self) -> Option<SubjectType> {
        if self.0.starts_with("tx_") {
            Some(SubjectType::Movie)
        } else if self.0.starts_with("sub_") {
            Some(SubjectType::Subscription)
        } else {
            None
        }
    }
}

fn random_suffix() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        out.push(BASE36[(bits % 36) as usize] as char);
        bits /= 36;
    }
    out
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TxRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TxRef::parse(value)
    }
}

impl From<TxRef> for String {
    fn from(r: TxRef) -> Self {
        r.0
    }
}
