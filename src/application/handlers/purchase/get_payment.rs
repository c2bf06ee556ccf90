//! GetPaymentHandler - one ledger row, for its owner or an admin.

use std::sync::Arc;

use crate::domain::foundation::AuthContext;
use crate::domain::purchase::{PurchaseError, Transaction, TxRef};
use crate::ports::TransactionLedger;

#[derive(Debug, Clone)]
pub struct GetPaymentQuery {
    pub requester: AuthContext,
    pub tx_ref: TxRef,
}

pub struct GetPaymentHandler {
    ledger: Arc<dyn TransactionLedger>,
}

impl GetPaymentHandler {
    pub fn new(ledger: Arc<dyn TransactionLedger>) -> Self {
        Self { ledger }
    }

    /// Reads the ledger only; a pending row is not verified here.
    pub async fn handle(&self, query: GetPaymentQuery) -> Result<Transaction, PurchaseError> {
        let transaction = self
            .ledger
            .find_by_ref(&query.tx_ref)
            .await?
            .ok_or_else(|| PurchaseError::transaction_not_found(&query.tx_ref))?;

        if !query.requester.can_act_for(&transaction.user_id) {
            tracing::warn!(
                tx_ref = %query.tx_ref,
                user_id = %query.requester.user_id,
                "Payment details requested for another user's transaction"
            );
            return Err(PurchaseError::unauthorized("transaction belongs to another user"));
        }
        Ok(transaction)
    }
}
