//! InitiatePurchaseHandler - opens a hosted checkout for a movie or plan.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, Money, Timestamp};
use crate::domain::purchase::{PurchaseError, PurchaseSubject, Transaction, TxRef};
use crate::ports::{
    CheckoutRequest, EntitlementStore, MovieCatalog, Payer, PaymentGateway, TransactionLedger,
};

/// Command to start a purchase.
#[derive(Debug, Clone)]
pub struct InitiatePurchaseCommand {
    pub buyer: AuthenticatedUser,
    pub subject: PurchaseSubject,
    /// Amount the client displayed. When present it must equal the catalog price.
    pub expected_amount: Option<Money>,
    /// Receipt address; defaults to the account email.
    pub payer_email: Option<String>,
}

/// Result of a successfully opened checkout.
#[derive(Debug, Clone)]
pub struct InitiatePurchaseResult {
    pub tx_ref: TxRef,
    pub checkout_url: String,
    pub transaction: Transaction,
}

/// URLs handed to the gateway, derived from the public app URL.
#[derive(Debug, Clone)]
pub struct CheckoutLinks {
    app_base_url: String,
}

impl CheckoutLinks {
    pub fn new(app_base_url: impl Into<String>) -> Self {
        Self {
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}/api/payment/callback", self.app_base_url)
    }

    /// Where the browser lands after checkout; carries the tx_ref for verify-on-return.
    pub fn return_url(&self, subject: &PurchaseSubject, tx_ref: &TxRef) -> String {
        match subject {
            PurchaseSubject::Movie(movie_id) => format!(
                "{}/user/get/free?tx_ref={}&movieId={}",
                self.app_base_url, tx_ref, movie_id
            ),
            PurchaseSubject::Subscription(_) => {
                format!("{}/user/subscription?tx_ref={}", self.app_base_url, tx_ref)
            }
        }
    }
}

/// Handler for purchase initiation.
///
/// Writes the pending ledger row before contacting the gateway, and deletes
/// it again if the gateway refuses, so no pending row exists without a
/// matching gateway-side checkout.
pub struct InitiatePurchaseHandler {
    ledger: Arc<dyn TransactionLedger>,
    entitlements: Arc<dyn EntitlementStore>,
    catalog: Arc<dyn MovieCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    links: CheckoutLinks,
}

/// What is being sold, priced by the catalog.
struct PricedSubject {
    amount: Money,
    title: String,
    description: String,
}

impl InitiatePurchaseHandler {
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        entitlements: Arc<dyn EntitlementStore>,
        catalog: Arc<dyn MovieCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        links: CheckoutLinks,
    ) -> Self {
        Self {
            ledger,
            entitlements,
            catalog,
            gateway,
            links,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiatePurchaseCommand,
    ) -> Result<InitiatePurchaseResult, PurchaseError> {
        // 1. Price the subject from the catalog
        let priced = self.price(&cmd).await?;

        if let Some(expected) = &cmd.expected_amount {
            if expected != &priced.amount {
                return Err(PurchaseError::validation(
                    "amount",
                    format!("expected {}, price is {}", expected, priced.amount),
                ));
            }
        }

        // 2. Record the attempt before the gateway knows about it
        let now = Timestamp::now();
        let tx_ref = TxRef::generate(cmd.subject.subject_type(), now);
        let pending = Transaction::pending(
            cmd.buyer.id.clone(),
            cmd.subject,
            priced.amount.clone(),
            tx_ref.clone(),
            now,
        );
        let transaction = self.ledger.create(&pending).await.map_err(|e| {
            tracing::error!(tx_ref = %tx_ref, error = %e, "Failed to record pending transaction");
            PurchaseError::from(e)
        })?;

        // 3. Open the checkout, rolling back on refusal
        let email = cmd
            .payer_email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| cmd.buyer.email.clone());
        let request = CheckoutRequest {
            tx_ref: tx_ref.clone(),
            amount: priced.amount,
            payer: Payer::from_display_name(email, cmd.buyer.display_name.as_deref()),
            callback_url: self.links.callback_url(),
            return_url: self.links.return_url(&transaction.subject, &tx_ref),
            title: priced.title,
            description: priced.description,
        };

        let session = match self.gateway.initiate(request).await {
            Ok(session) => session,
            Err(gateway_error) => {
                if let Err(e) = self.ledger.delete_pending(&tx_ref).await {
                    tracing::error!(
                        tx_ref = %tx_ref,
                        error = %e,
                        "Failed to roll back pending transaction"
                    );
                }
                tracing::warn!(
                    tx_ref = %tx_ref,
                    user_id = %transaction.user_id,
                    error = %gateway_error,
                    "Gateway refused checkout, pending transaction rolled back"
                );
                return Err(gateway_error.into());
            }
        };

        tracing::info!(
            tx_ref = %tx_ref,
            user_id = %transaction.user_id,
            subject = %transaction.subject.subject_id(),
            status = "pending",
            "Purchase initiated"
        );

        Ok(InitiatePurchaseResult {
            tx_ref,
            checkout_url: session.checkout_url,
            transaction,
        })
    }

    async fn price(&self, cmd: &InitiatePurchaseCommand) -> Result<PricedSubject, PurchaseError> {
        match &cmd.subject {
            PurchaseSubject::Movie(movie_id) => {
                let movie = self
                    .catalog
                    .find_movie(movie_id)
                    .await?
                    .ok_or_else(|| PurchaseError::movie_not_found(movie_id))?;
                if movie.is_free() {
                    return Err(PurchaseError::invalid_state("Movie is free to watch"));
                }
                if self.entitlements.is_unlocked(&cmd.buyer.id, &movie).await? {
                    return Err(PurchaseError::invalid_state(
                        "Movie is already unlocked for this user",
                    ));
                }
                Ok(PricedSubject {
                    amount: movie.fee.clone(),
                    title: "Movie Payment".to_string(),
                    description: format!("Access to {}", movie.title),
                })
            }
            PurchaseSubject::Subscription(plan) => {
                let offer = self
                    .catalog
                    .find_plan(*plan)
                    .await?
                    .ok_or_else(|| PurchaseError::plan_not_found(plan.as_str()))?;
                if !offer.is_purchasable() {
                    return Err(PurchaseError::invalid_state(format!(
                        "Plan {} cannot be purchased",
                        plan
                    )));
                }
                Ok(PricedSubject {
                    amount: offer.price.clone(),
                    title: "Subscription Payment".to_string(),
                    description: format!("{} plan, {} days", plan, offer.duration_days),
                })
            }
        }
    }
}
