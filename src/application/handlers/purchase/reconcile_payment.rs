//! ReconcilePaymentHandler - resolves a transaction against the gateway.
//!
//! One routine behind three triggers: the gateway callback, the client's
//! status poll and the explicit verify-on-return. It holds no lock; safety
//! under concurrent calls for the same `tx_ref` comes from the ledger's
//! idempotent transitions and the set semantics of movie grants.
//!
//! # Saga
//!
//! 1. `mark_completed` on the ledger is the durability boundary.
//! 2. The entitlement grant follows. If it fails the transaction stays
//!    completed, the caller gets `Inconsistent`, and the next reconcile of the
//!    same `tx_ref` re-applies the grant.
//! 3. The row is read again after the grant. A refund that landed in between
//!    wins: the grant is withdrawn and the refund is reported.

use std::sync::Arc;

use crate::domain::entitlement::{Subscription, SubscriptionPlan};
use crate::domain::foundation::{AuthContext, ErrorCode, MovieId};
use crate::domain::purchase::{
    PurchaseError, PurchaseSubject, ReportedStatus, Transaction, TransactionStatus, TxRef,
    VerificationResult,
};
use crate::ports::{EntitlementStore, MovieCatalog, PaymentGateway, TransactionLedger};

/// Subscription length used when the plan offer has since been removed.
const FALLBACK_PLAN_DAYS: u32 = 30;

/// Who asked for the reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    /// The payment provider's callback. Authenticated by signature, not by user.
    Gateway,
    /// A signed-in user polling or returning from checkout.
    User(AuthContext),
}

/// Which entry point triggered the reconciliation. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTrigger {
    Callback,
    StatusPoll,
    VerifyOnReturn,
}

impl ReconcileTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileTrigger::Callback => "callback",
            ReconcileTrigger::StatusPoll => "status_poll",
            ReconcileTrigger::VerifyOnReturn => "verify_on_return",
        }
    }
}

/// Command to reconcile one transaction.
#[derive(Debug, Clone)]
pub struct ReconcilePaymentCommand {
    pub tx_ref: TxRef,
    pub requester: Requester,
    pub trigger: ReconcileTrigger,
    /// Status polls name the movie too; a transaction for anything else is not found.
    pub expected_movie: Option<MovieId>,
}

/// Outcome reported back to the trigger.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub status: ReportedStatus,
    pub transaction: Transaction,
    /// True when the entitlement grant was applied (or re-applied) by this call.
    pub entitlement_applied: bool,
}

/// Handler for payment reconciliation.
pub struct ReconcilePaymentHandler {
    ledger: Arc<dyn TransactionLedger>,
    entitlements: Arc<dyn EntitlementStore>,
    catalog: Arc<dyn MovieCatalog>,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReconcilePaymentHandler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        entitlements: Arc<dyn EntitlementStore>,
        catalog: Arc<dyn MovieCatalog>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            ledger,
            entitlements,
            catalog,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcilePaymentCommand,
    ) -> Result<ReconcileOutcome, PurchaseError> {
        // 1. Look up and authorize
        let transaction = self
            .ledger
            .find_by_ref(&cmd.tx_ref)
            .await?
            .ok_or_else(|| PurchaseError::transaction_not_found(&cmd.tx_ref))?;

        if let Requester::User(ctx) = &cmd.requester {
            if !ctx.can_act_for(&transaction.user_id) {
                tracing::warn!(
                    tx_ref = %cmd.tx_ref,
                    user_id = %ctx.user_id,
                    "Reconcile requested for another user's transaction"
                );
                return Err(PurchaseError::unauthorized(
                    "transaction belongs to another user",
                ));
            }
        }

        if let Some(movie_id) = cmd.expected_movie {
            if transaction.subject.movie_id() != Some(movie_id) {
                return Err(PurchaseError::transaction_not_found(&cmd.tx_ref));
            }
        }

        // 2. Terminal rows answer from the ledger without calling the gateway
        let settled = match transaction.status {
            TransactionStatus::Pending => self.verify_pending(&transaction).await?,
            _ => transaction,
        };

        let outcome = self.settle(settled).await?;
        tracing::info!(
            tx_ref = %cmd.tx_ref,
            user_id = %outcome.transaction.user_id,
            status = %outcome.status,
            trigger = cmd.trigger.as_str(),
            entitlement_applied = outcome.entitlement_applied,
            "Payment reconciled"
        );
        Ok(outcome)
    }

    /// Ask the gateway about a pending row and record any explicit answer.
    async fn verify_pending(
        &self,
        transaction: &Transaction,
    ) -> Result<Transaction, PurchaseError> {
        let tx_ref = &transaction.tx_ref;
        match self.gateway.verify(tx_ref).await {
            VerificationResult::Success(payment) => {
                if payment.amount != transaction.amount {
                    tracing::error!(
                        tx_ref = %tx_ref,
                        user_id = %transaction.user_id,
                        expected = %transaction.amount,
                        reported = %payment.amount,
                        "Gateway reported a different amount, leaving transaction pending"
                    );
                    return Ok(transaction.clone());
                }
                self.ledger
                    .mark_completed(tx_ref, &payment)
                    .await
                    .map_err(|e| match e.code {
                        ErrorCode::InvalidStateTransition => {
                            tracing::error!(
                                alert = "entitlement_divergence",
                                tx_ref = %tx_ref,
                                user_id = %transaction.user_id,
                                "Gateway reports success for a transaction the ledger marked failed"
                            );
                            PurchaseError::inconsistent(
                                tx_ref,
                                "gateway reports success for a failed transaction",
                            )
                        }
                        _ => PurchaseError::from(e),
                    })
            }
            VerificationResult::Failed { reason } => {
                tracing::info!(
                    tx_ref = %tx_ref,
                    reason = %reason,
                    "Gateway reports payment failed"
                );
                Ok(self.ledger.mark_failed(tx_ref).await?)
            }
            VerificationResult::Pending { reason } => {
                tracing::debug!(tx_ref = %tx_ref, reason = %reason, "Payment still pending");
                Ok(transaction.clone())
            }
        }
    }

    /// Report the row's status, (re-)applying the grant for completed rows.
    async fn settle(&self, transaction: Transaction) -> Result<ReconcileOutcome, PurchaseError> {
        if transaction.status != TransactionStatus::Completed {
            return Ok(ReconcileOutcome {
                status: transaction.status.reported(),
                transaction,
                entitlement_applied: false,
            });
        }

        match self.apply_entitlement(&transaction).await {
            Ok(()) => self.confirm_still_completed(transaction).await,
            Err(e) => {
                tracing::error!(
                    alert = "entitlement_divergence",
                    tx_ref = %transaction.tx_ref,
                    user_id = %transaction.user_id,
                    error = %e,
                    "Payment completed but entitlement grant failed; retry reconcile"
                );
                Err(PurchaseError::inconsistent(
                    &transaction.tx_ref,
                    format!("payment recorded but access grant failed: {}", e),
                ))
            }
        }
    }

    /// Re-read the row after granting. Only a row that is still completed
    /// keeps the grant.
    async fn confirm_still_completed(
        &self,
        granted: Transaction,
    ) -> Result<ReconcileOutcome, PurchaseError> {
        let current = self
            .ledger
            .find_by_ref(&granted.tx_ref)
            .await?
            .ok_or_else(|| PurchaseError::transaction_not_found(&granted.tx_ref))?;

        if current.status == TransactionStatus::Completed {
            return Ok(ReconcileOutcome {
                status: ReportedStatus::Success,
                transaction: current,
                entitlement_applied: true,
            });
        }

        tracing::warn!(
            tx_ref = %current.tx_ref,
            user_id = %current.user_id,
            status = %current.status,
            "Transaction left completed during grant, withdrawing access"
        );
        if let Err(e) = self.withdraw_entitlement(&current).await {
            tracing::error!(
                alert = "entitlement_divergence",
                tx_ref = %current.tx_ref,
                user_id = %current.user_id,
                error = %e,
                "Access granted for a refunded transaction could not be withdrawn"
            );
            return Err(PurchaseError::inconsistent(
                &current.tx_ref,
                format!("refunded during grant and revoke failed: {}", e),
            ));
        }
        Ok(ReconcileOutcome {
            status: current.status.reported(),
            transaction: current,
            entitlement_applied: false,
        })
    }

    async fn withdraw_entitlement(&self, transaction: &Transaction) -> Result<(), PurchaseError> {
        match transaction.subject {
            PurchaseSubject::Movie(movie_id) => {
                self.entitlements
                    .revoke_movie(&transaction.user_id, &movie_id)
                    .await?;
            }
            PurchaseSubject::Subscription(plan) => {
                self.entitlements
                    .cancel_subscription(&transaction.user_id, plan)
                    .await?;
            }
        }
        Ok(())
    }

    async fn apply_entitlement(&self, transaction: &Transaction) -> Result<(), PurchaseError> {
        match transaction.subject {
            PurchaseSubject::Movie(movie_id) => {
                let added = self
                    .entitlements
                    .grant_movie(&transaction.user_id, &movie_id)
                    .await?;
                if added {
                    tracing::info!(
                        tx_ref = %transaction.tx_ref,
                        user_id = %transaction.user_id,
                        movie_id = %movie_id,
                        "Movie unlocked"
                    );
                }
                Ok(())
            }
            PurchaseSubject::Subscription(plan) => {
                self.activate_subscription(transaction, plan).await
            }
        }
    }

    /// Activate the plan from the completion time. Replays produce the same
    /// record, which the store leaves alone, and the store never lets an
    /// older subscription replace a later one.
    async fn activate_subscription(
        &self,
        transaction: &Transaction,
        plan: SubscriptionPlan,
    ) -> Result<(), PurchaseError> {
        let start = transaction.completed_at.unwrap_or(transaction.updated_at);
        let duration_days = match self.catalog.find_plan(plan).await? {
            Some(offer) => offer.duration_days,
            None => {
                tracing::warn!(plan = %plan, "Plan offer missing, using fallback duration");
                FALLBACK_PLAN_DAYS
            }
        };
        let subscription = Subscription::activated(plan, start, duration_days);
        let written = self
            .entitlements
            .set_subscription(&transaction.user_id, &subscription)
            .await?;
        if !written {
            tracing::debug!(
                tx_ref = %transaction.tx_ref,
                user_id = %transaction.user_id,
                "Stored subscription is as new or newer, left unchanged"
            );
            return Ok(());
        }
        tracing::info!(
            tx_ref = %transaction.tx_ref,
            user_id = %transaction.user_id,
            plan = %plan,
            ends_at = %subscription.end_date.as_datetime(),
            "Subscription activated"
        );
        Ok(())
    }
}
