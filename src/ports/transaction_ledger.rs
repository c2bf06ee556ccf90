//! Transaction ledger port.
//!
//! The ledger is the source of truth for "did this user pay". Every mutation
//! must be a single atomic conditional update keyed by `tx_ref`, never a
//! read-modify-write across two round trips; that is what lets the gateway
//! callback, the status poll and verify-on-return race safely without locks.
//!
//! # Contract
//!
//! | Method | Already in target state | Illegal source state |
//! |--------|-------------------------|----------------------|
//! | `mark_completed` | returns existing row | `InvalidStateTransition` (failed) |
//! | `mark_failed` | returns existing row | returns existing row (completed/refunded untouched) |
//! | `mark_refunded` | `InvalidStateTransition` | `InvalidStateTransition` |

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::purchase::{LedgerSummary, Transaction, TxRef, VerifiedPayment};

/// Repository port for the append-only purchase ledger.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Persist a new pending transaction.
    ///
    /// # Errors
    ///
    /// - `DuplicateReference` if the `tx_ref` already exists
    /// - `DatabaseError` on persistence failure
    async fn create(&self, transaction: &Transaction) -> Result<Transaction, DomainError>;

    /// Look up a transaction by its external reference.
    async fn find_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, DomainError>;

    /// Move `pending -> completed`. Idempotent on completed rows.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` for an unknown reference
    /// - `InvalidStateTransition` if the row already failed
    async fn mark_completed(
        &self,
        tx_ref: &TxRef,
        payment: &VerifiedPayment,
    ) -> Result<Transaction, DomainError>;

    /// Move `pending -> failed`. A no-op for any other status.
    async fn mark_failed(&self, tx_ref: &TxRef) -> Result<Transaction, DomainError>;

    /// Move `completed -> refunded`, recording reason and acting admin.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` for an unknown reference
    /// - `InvalidStateTransition` unless the row is completed
    /// - `ValidationFailed` for a blank reason
    async fn mark_refunded(
        &self,
        tx_ref: &TxRef,
        reason: &str,
        actor: &UserId,
    ) -> Result<Transaction, DomainError>;

    /// Remove a row that is still pending. Returns false if nothing was removed.
    ///
    /// Only used to roll back an initiation the gateway refused.
    async fn delete_pending(&self, tx_ref: &TxRef) -> Result<bool, DomainError>;

    /// All transactions for a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError>;

    /// Ledger statistics, optionally limited to rows created at or after `since`.
    async fn summarize(&self, since: Option<Timestamp>) -> Result<LedgerSummary, DomainError>;
}
