//! ListPaymentHistoryHandler - a user's purchases, newest first.

use std::sync::Arc;

use crate::domain::foundation::{AuthContext, UserId};
use crate::domain::purchase::{PurchaseError, Transaction};
use crate::ports::TransactionLedger;

#[derive(Debug, Clone)]
pub struct ListPaymentHistoryQuery {
    pub requester: AuthContext,
    /// Whose history to list; defaults to the requester. Admins may name anyone.
    pub user_id: Option<UserId>,
}

pub struct ListPaymentHistoryHandler {
    ledger: Arc<dyn TransactionLedger>,
}

impl ListPaymentHistoryHandler {
    pub fn new(ledger: Arc<dyn TransactionLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        query: ListPaymentHistoryQuery,
    ) -> Result<Vec<Transaction>, PurchaseError> {
        let target = query
            .user_id
            .unwrap_or_else(|| query.requester.user_id.clone());
        if !query.requester.can_act_for(&target) {
            return Err(PurchaseError::unauthorized(
                "payment history of another user",
            ));
        }
        Ok(self.ledger.list_by_user(&target).await?)
    }
}
