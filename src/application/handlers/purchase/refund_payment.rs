//! RefundPaymentHandler - admin reversal of a completed purchase.

use std::sync::Arc;

use crate::domain::foundation::{AuthContext, ErrorCode, Timestamp};
use crate::domain::purchase::{
    PurchaseError, PurchaseSubject, Transaction, TransactionStatus, TxRef,
};
use crate::ports::{EntitlementStore, TransactionLedger};

/// Command to refund a completed transaction.
#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub actor: AuthContext,
    pub tx_ref: TxRef,
    pub reason: String,
}

/// Result of a successful refund.
#[derive(Debug, Clone)]
pub struct RefundPaymentResult {
    pub transaction: Transaction,
    /// False when the grant had already been removed.
    pub access_revoked: bool,
    /// The user can still watch the movie through a current subscription.
    pub still_accessible_via_subscription: bool,
}

/// Handler for admin refunds.
///
/// The ledger is marked refunded first. A failure to revoke afterwards
/// leaves access in place while the ledger says refunded, which is reported
/// as `Inconsistent` and logged for operator attention.
pub struct RefundPaymentHandler {
    ledger: Arc<dyn TransactionLedger>,
    entitlements: Arc<dyn EntitlementStore>,
}

impl RefundPaymentHandler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        entitlements: Arc<dyn EntitlementStore>,
    ) -> Self {
        Self {
            ledger,
            entitlements,
        }
    }

    pub async fn handle(
        &self,
        cmd: RefundPaymentCommand,
    ) -> Result<RefundPaymentResult, PurchaseError> {
        if !cmd.actor.is_admin {
            return Err(PurchaseError::unauthorized("refunds require an admin"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(PurchaseError::validation("reason", "Refund reason is required"));
        }

        // 1. Precondition check before touching anything
        let current = self
            .ledger
            .find_by_ref(&cmd.tx_ref)
            .await?
            .ok_or_else(|| PurchaseError::transaction_not_found(&cmd.tx_ref))?;
        if current.status != TransactionStatus::Completed {
            return Err(PurchaseError::invalid_state(format!(
                "Only completed transactions can be refunded (status is {})",
                current.status
            )));
        }

        // 2. Ledger first; the conditional update rejects a concurrent refund
        let transaction = self
            .ledger
            .mark_refunded(&cmd.tx_ref, &cmd.reason, &cmd.actor.user_id)
            .await
            .map_err(|e| match e.code {
                ErrorCode::InvalidStateTransition => {
                    PurchaseError::invalid_state("Transaction is no longer completed")
                }
                _ => PurchaseError::from(e),
            })?;

        // 3. Revoke access
        let revoked = match transaction.subject {
            PurchaseSubject::Movie(movie_id) => {
                self.entitlements
                    .revoke_movie(&transaction.user_id, &movie_id)
                    .await
            }
            PurchaseSubject::Subscription(plan) => {
                self.entitlements
                    .cancel_subscription(&transaction.user_id, plan)
                    .await
            }
        };
        let access_revoked = revoked.map_err(|e| {
            tracing::error!(
                alert = "entitlement_divergence",
                tx_ref = %transaction.tx_ref,
                user_id = %transaction.user_id,
                error = %e,
                "Transaction refunded but access could not be revoked"
            );
            PurchaseError::inconsistent(
                &transaction.tx_ref,
                format!("refund recorded but access revoke failed: {}", e),
            )
        })?;

        let still_accessible_via_subscription = match transaction.subject {
            PurchaseSubject::Movie(_) => match self.entitlements.find(&transaction.user_id).await {
                Ok(entitlement) => entitlement.has_catalog_subscription(Timestamp::now()),
                Err(e) => {
                    tracing::warn!(
                        tx_ref = %transaction.tx_ref,
                        error = %e,
                        "Could not check remaining subscription access"
                    );
                    false
                }
            },
            PurchaseSubject::Subscription(_) => false,
        };

        tracing::info!(
            tx_ref = %transaction.tx_ref,
            user_id = %transaction.user_id,
            refunded_by = %cmd.actor.user_id,
            status = %transaction.status,
            access_revoked,
            still_accessible_via_subscription,
            "Payment refunded"
        );

        Ok(RefundPaymentResult {
            transaction,
            access_revoked,
            still_accessible_via_subscription,
        })
    }
}
