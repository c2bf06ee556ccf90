//! GetPaymentStatsHandler - admin ledger summary.

use std::sync::Arc;

use crate::domain::foundation::{AuthContext, Timestamp};
use crate::domain::purchase::{LedgerSummary, PurchaseError};
use crate::ports::TransactionLedger;

#[derive(Debug, Clone)]
pub struct GetPaymentStatsQuery {
    pub requester: AuthContext,
    pub since: Option<Timestamp>,
}

pub struct GetPaymentStatsHandler {
    ledger: Arc<dyn TransactionLedger>,
}

impl GetPaymentStatsHandler {
    pub fn new(ledger: Arc<dyn TransactionLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatsQuery,
    ) -> Result<LedgerSummary, PurchaseError> {
        if !query.requester.is_admin {
            return Err(PurchaseError::unauthorized("payment statistics require an admin"));
        }
        Ok(self.ledger.summarize(query.since).await?)
    }
}
