//! Transaction status state machine.
//!
//! `pending` settles exactly once into `completed` or `failed`. A completed
//! purchase may later be refunded by an admin; nothing else moves.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger status of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created at initiation, awaiting the gateway's verdict.
    Pending,

    /// Gateway verified payment.
    Completed,

    /// Gateway explicitly reported failure. A retry is a new transaction.
    Failed,

    /// Completed purchase reversed by an admin.
    Refunded,
}

impl TransactionStatus {
    /// True once the gateway's verdict has been recorded.
    pub fn is_settled(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    /// The status word reported to polling clients.
    pub fn reported(&self) -> ReportedStatus {
        match self {
            TransactionStatus::Pending => ReportedStatus::Pending,
            TransactionStatus::Completed => ReportedStatus::Success,
            TransactionStatus::Failed => ReportedStatus::Failed,
            TransactionStatus::Refunded => ReportedStatus::Refunded,
        }
    }
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed => vec![],
            Refunded => vec![],
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown transaction status '{}'", other),
            )),
        }
    }
}

/// Status vocabulary of the poll and verify endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedStatus {
    Success,
    Failed,
    Pending,
    Refunded,
}

impl ReportedStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ReportedStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportedStatus::Success => "success",
            ReportedStatus::Failed => "failed",
            ReportedStatus::Pending => "pending",
            ReportedStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
