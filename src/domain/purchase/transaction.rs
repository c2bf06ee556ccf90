//! Transaction aggregate - one purchase attempt in the ledger.
//!
//! The ledger is append-only: rows are created pending, settle once, and a
//! completed row may be refunded. Mutators return whether anything changed
//! so idempotent callers can tell a first write from a replay.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, StateMachine, Timestamp, TransactionId, UserId,
};

use super::{PurchaseSubject, TransactionStatus, TxRef, VerifiedPayment};

/// Refund bookkeeping recorded by an admin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub refunded_at: Timestamp,
    pub reason: String,
    pub refunded_by: UserId,
}

/// Ledger entry for one purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub subject: PurchaseSubject,
    pub amount: Money,
    pub tx_ref: TxRef,
    pub status: TransactionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub gateway_reference: Option<String>,
    pub refund: Option<RefundRecord>,
}

impl Transaction {
    /// A new pending attempt, created before the gateway is contacted.
    pub fn pending(
        user_id: UserId,
        subject: PurchaseSubject,
        amount: Money,
        tx_ref: TxRef,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            subject,
            amount,
            tx_ref,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            gateway_reference: None,
            refund: None,
        }
    }

    /// Records a verified payment.
    ///
    /// Replaying on a completed (or since refunded) row is a no-op and
    /// returns `Ok(false)`. A failed row cannot be completed.
    pub fn complete(
        &mut self,
        payment: &VerifiedPayment,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        match self.status {
            TransactionStatus::Completed | TransactionStatus::Refunded => Ok(false),
            _ => {
                self.transition_to(TransactionStatus::Completed)?;
                self.completed_at = Some(payment.paid_at.unwrap_or(now));
                self.gateway_reference = payment.gateway_reference.clone();
                self.updated_at = now;
                Ok(true)
            }
        }
    }

    /// Records an explicit gateway failure. Ignored unless still pending.
    pub fn fail(&mut self, now: Timestamp) -> bool {
        if self.status != TransactionStatus::Pending {
            return false;
        }
        self.status = TransactionStatus::Failed;
        self.updated_at = now;
        true
    }

    /// Reverses a completed purchase.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` for a blank reason, `InvalidStateTransition`
    /// unless the row is completed.
    pub fn refund(
        &mut self,
        reason: &str,
        actor: &UserId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason", "Refund reason is required"));
        }
        self.transition_to(TransactionStatus::Refunded)?;
        self.refund = Some(RefundRecord {
            refunded_at: now,
            reason: reason.to_string(),
            refunded_by: actor.clone(),
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    fn transition_to(&mut self, target: TransactionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition transaction {} from {} to {}",
                    self.tx_ref, self.status, target
                ),
            )
            .with_detail("tx_ref", self.tx_ref.as_str())
            .with_detail("status", self.status.as_str())
        })?;
        Ok(())
    }
}
