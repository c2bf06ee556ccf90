//! Money value object.
//!
//! Amounts are held in minor units (cents) to avoid float drift. The gateway
//! speaks decimal strings, so conversion in both directions lives here.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO-4217 style currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a currency code, normalising to uppercase.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three letter code",
            ));
        }
        Ok(Self(code))
    }

    /// Ethiopian birr, the gateway's home currency.
    pub fn etb() -> Self {
        Self("ETB".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::etb()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(value)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// A non-negative amount of money in a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount_cents: i64,
    pub currency: Currency,
}

impl Money {
    /// Creates a money value, rejecting negative amounts.
    pub fn new(amount_cents: i64, currency: Currency) -> Result<Self, ValidationError> {
        if amount_cents < 0 {
            return Err(ValidationError::out_of_range(
                "amount",
                0,
                i64::MAX,
                amount_cents,
            ));
        }
        Ok(Self {
            amount_cents,
            currency,
        })
    }

    /// Shorthand for an ETB amount; negative input clamps to zero.
    pub fn etb(amount_cents: i64) -> Self {
        Self {
            amount_cents: amount_cents.max(0),
            currency: Currency::etb(),
        }
    }

    /// Parses a decimal string such as `"9.99"`, `"100"` or `"12.5"`.
    ///
    /// More than two fractional digits are rejected rather than rounded.
    pub fn parse_decimal(input: &str, currency: Currency) -> Result<Self, ValidationError> {
        let input = input.trim();
        let invalid = || {
            let reason = format!("'{}' is not a decimal amount", input);
            ValidationError::invalid_format("amount", reason)
        };

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse::<i64>().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(invalid)?;

        Money::new(cents, currency)
    }

    /// Renders the amount as a two-decimal string (`"9.99"`).
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }

    /// True when nothing needs to be paid.
    pub fn is_free(&self) -> bool {
        self.amount_cents == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal_string(), self.currency)
    }
}
