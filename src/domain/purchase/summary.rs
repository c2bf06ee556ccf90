//! Aggregate figures over the ledger for the admin dashboard.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::foundation::{Currency, Money};

use super::{Transaction, TransactionStatus};

/// Per-status counts, revenue and refunds across a set of transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
    pub refunded: u64,
    /// Completed (not refunded) amounts, one entry per currency.
    pub revenue: Vec<Money>,
    /// Refunded amounts, one entry per currency.
    pub refunded_total: Vec<Money>,
    /// Distinct users with at least one completed purchase.
    pub paying_users: u64,
}

impl LedgerSummary {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut summary = LedgerSummary::default();
        let mut revenue: BTreeMap<Currency, i64> = BTreeMap::new();
        let mut refunded: BTreeMap<Currency, i64> = BTreeMap::new();
        let mut payers = BTreeSet::new();

        for tx in transactions {
            match tx.status {
                TransactionStatus::Pending => summary.pending += 1,
                TransactionStatus::Failed => summary.failed += 1,
                TransactionStatus::Completed => {
                    summary.completed += 1;
                    *revenue.entry(tx.amount.currency.clone()).or_default() +=
                        tx.amount.amount_cents;
                    payers.insert(tx.user_id.clone());
                }
                TransactionStatus::Refunded => {
                    summary.refunded += 1;
                    *refunded.entry(tx.amount.currency.clone()).or_default() +=
                        tx.amount.amount_cents;
                }
            }
        }

        summary.revenue = to_money(revenue);
        summary.refunded_total = to_money(refunded);
        summary.paying_users = payers.len() as u64;
        summary
    }

    pub fn total(&self) -> u64 {
        self.pending + self.completed + self.failed + self.refunded
    }
}

fn to_money(totals: BTreeMap<Currency, i64>) -> Vec<Money> {
    totals
        .into_iter()
        .map(|(currency, amount_cents)| Money {
            amount_cents,
            currency,
        })
        .collect()
}
