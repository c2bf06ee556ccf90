//! Normalized outcome of asking the gateway about a transaction.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, Timestamp};

use super::TxRef;

/// Payment details the gateway confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub tx_ref: TxRef,
    pub amount: Money,
    /// The provider's own reference for the charge, when it reports one.
    pub gateway_reference: Option<String>,
    pub paid_at: Option<Timestamp>,
}

/// The gateway's verdict, reduced to three cases.
///
/// `Pending` absorbs everything that is not an explicit answer: transport
/// errors, timeouts, malformed bodies and unknown status words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Success(VerifiedPayment),
    Failed { reason: String },
    Pending { reason: String },
}

impl VerificationResult {
    pub fn pending(reason: impl Into<String>) -> Self {
        VerificationResult::Pending {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        VerificationResult::Failed {
            reason: reason.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationResult::Success(_) => "success",
            VerificationResult::Failed { .. } => "failed",
            VerificationResult::Pending { .. } => "pending",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_gateway_vocabulary() {
        assert_eq!(VerificationResult::pending("timeout").label(), "pending");
        assert_eq!(VerificationResult::failed("declined").label(), "failed");

        let ok = VerificationResult::Success(VerifiedPayment {
            tx_ref: TxRef::parse("tx_1_a").unwrap(),
            amount: Money::etb(999),
            gateway_reference: None,
            paid_at: None,
        });
        assert_eq!(ok.label(), "success");
    }
}
