//! In-memory transaction ledger.
//!
//! Each operation holds the map lock for its whole read-check-write, which
//! gives the same single-document atomicity the Postgres adapter gets from
//! conditional UPDATEs. Suitable for tests and single-process development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::purchase::{
    LedgerSummary, Transaction, TransactionStatus, TxRef, VerifiedPayment,
};
use crate::ports::TransactionLedger;

#[derive(Default)]
pub struct InMemoryTransactionLedger {
    rows: Mutex<HashMap<TxRef, Transaction>>,
}

impl InMemoryTransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row. Test and debugging aid.
    pub fn all(&self) -> Vec<Transaction> {
        match self.rows.lock() {
            Ok(rows) => rows.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }

    pub fn count_with_status(&self, status: TransactionStatus) -> usize {
        self.all().iter().filter(|t| t.status == status).count()
    }

    fn rows(&self) -> Result<MutexGuard<'_, HashMap<TxRef, Transaction>>, DomainError> {
        self.rows
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "ledger lock poisoned"))
    }
}

fn not_found(tx_ref: &TxRef) -> DomainError {
    DomainError::new(
        ErrorCode::TransactionNotFound,
        format!("Transaction not found: {}", tx_ref),
    )
    .with_detail("tx_ref", tx_ref.as_str())
}

#[async_trait]
impl TransactionLedger for InMemoryTransactionLedger {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction, DomainError> {
        let mut rows = self.rows()?;
        if rows.contains_key(&transaction.tx_ref) {
            return Err(DomainError::new(
                ErrorCode::DuplicateReference,
                format!("tx_ref already exists: {}", transaction.tx_ref),
            )
            .with_detail("tx_ref", transaction.tx_ref.as_str()));
        }
        rows.insert(transaction.tx_ref.clone(), transaction.clone());
        Ok(transaction.clone())
    }

    async fn find_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, DomainError> {
        Ok(self.rows()?.get(tx_ref).cloned())
    }

    async fn mark_completed(
        &self,
        tx_ref: &TxRef,
        payment: &VerifiedPayment,
    ) -> Result<Transaction, DomainError> {
        let mut rows = self.rows()?;
        let row = rows.get_mut(tx_ref).ok_or_else(|| not_found(tx_ref))?;
        row.complete(payment, Timestamp::now())?;
        Ok(row.clone())
    }

    async fn mark_failed(&self, tx_ref: &TxRef) -> Result<Transaction, DomainError> {
        let mut rows = self.rows()?;
        let row = rows.get_mut(tx_ref).ok_or_else(|| not_found(tx_ref))?;
        row.fail(Timestamp::now());
        Ok(row.clone())
    }

    async fn mark_refunded(
        &self,
        tx_ref: &TxRef,
        reason: &str,
        actor: &UserId,
    ) -> Result<Transaction, DomainError> {
        let mut rows = self.rows()?;
        let row = rows.get_mut(tx_ref).ok_or_else(|| not_found(tx_ref))?;
        row.refund(reason, actor, Timestamp::now())?;
        Ok(row.clone())
    }

    async fn delete_pending(&self, tx_ref: &TxRef) -> Result<bool, DomainError> {
        let mut rows = self.rows()?;
        match rows.get(tx_ref) {
            Some(row) if row.status == TransactionStatus::Pending => {
                rows.remove(tx_ref);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError> {
        let mut txs: Vec<Transaction> = self
            .rows()?
            .values()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }

    async fn summarize(&self, since: Option<Timestamp>) -> Result<LedgerSummary, DomainError> {
        let rows = self.rows()?;
        let selected = rows
            .values()
            .filter(|t| since.map_or(true, |s| !t.created_at.is_before(&s)));
        Ok(LedgerSummary::from_transactions(selected))
    }
}
