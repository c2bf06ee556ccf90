//! Shared wiring for integration tests: in-memory stores, a scripted
//! gateway, and one paid movie plus one subscription offer in the catalog.

#![allow(dead_code)]

use std::sync::Arc;

use cinegate::adapters::chapa::MockPaymentGateway;
use cinegate::adapters::http::PaymentAppState;
use cinegate::adapters::memory::{
    InMemoryEntitlementStore, InMemoryMovieCatalog, InMemoryTransactionLedger,
};
use cinegate::application::handlers::{
    CheckoutLinks, InitiatePurchaseCommand, InitiatePurchaseResult, ReconcileOutcome,
    ReconcilePaymentCommand, ReconcileTrigger, Requester,
};
use cinegate::domain::catalog::{Movie, PlanOffer};
use cinegate::domain::entitlement::SubscriptionPlan;
use cinegate::domain::foundation::{AuthenticatedUser, Money, MovieId, UserId};
use cinegate::domain::purchase::{
    PurchaseError, PurchaseSubject, Transaction, TxRef, VerifiedPayment,
};

pub const APP_BASE_URL: &str = "https://watch.example.com";

pub struct Harness {
    pub ledger: Arc<InMemoryTransactionLedger>,
    pub entitlements: Arc<InMemoryEntitlementStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub catalog: Arc<InMemoryMovieCatalog>,
    /// Paid movie, 9.99 ETB.
    pub movie: Movie,
    /// Free movie, never purchasable.
    pub free_movie: Movie,
}

impl Harness {
    pub fn new() -> Self {
        let movie = Movie::new(MovieId::new(), "Lamb", Money::etb(999));
        let free_movie = Movie::new(MovieId::new(), "Trailer Reel", Money::etb(0));
        let catalog = InMemoryMovieCatalog::new()
            .with_movie(movie.clone())
            .with_movie(free_movie.clone())
            .with_plan(PlanOffer::new(SubscriptionPlan::Premium, Money::etb(29_900), 30))
            .with_plan(PlanOffer::new(SubscriptionPlan::Basic, Money::etb(9_900), 30));

        Self {
            ledger: Arc::new(InMemoryTransactionLedger::new()),
            entitlements: Arc::new(InMemoryEntitlementStore::new()),
            gateway: Arc::new(MockPaymentGateway::new()),
            catalog: Arc::new(catalog),
            movie,
            free_movie,
        }
    }

    pub fn state(&self) -> PaymentAppState {
        PaymentAppState {
            ledger: self.ledger.clone(),
            entitlements: self.entitlements.clone(),
            catalog: self.catalog.clone(),
            gateway: self.gateway.clone(),
            links: CheckoutLinks::new(APP_BASE_URL),
            webhook_secret: None,
        }
    }

    pub async fn buy(
        &self,
        buyer: &AuthenticatedUser,
        subject: PurchaseSubject,
    ) -> Result<InitiatePurchaseResult, PurchaseError> {
        self.state()
            .initiate_handler()
            .handle(InitiatePurchaseCommand {
                buyer: buyer.clone(),
                subject,
                expected_amount: None,
                payer_email: None,
            })
            .await
    }

    pub async fn buy_movie(&self, buyer: &AuthenticatedUser) -> InitiatePurchaseResult {
        self.buy(buyer, PurchaseSubject::Movie(self.movie.id))
            .await
            .expect("initiate should succeed")
    }

    /// Script the gateway to report `tx` as paid in full.
    pub fn gateway_pays(&self, tx: &Transaction) {
        self.gateway.mark_paid(VerifiedPayment {
            tx_ref: tx.tx_ref.clone(),
            amount: tx.amount.clone(),
            gateway_reference: Some(format!("chapa-{}", tx.tx_ref)),
            paid_at: None,
        });
    }

    pub async fn callback(&self, tx_ref: &TxRef) -> Result<ReconcileOutcome, PurchaseError> {
        self.reconcile(tx_ref, Requester::Gateway, ReconcileTrigger::Callback, None)
            .await
    }

    pub async fn poll(
        &self,
        buyer: &AuthenticatedUser,
        movie_id: MovieId,
        tx_ref: &TxRef,
    ) -> Result<ReconcileOutcome, PurchaseError> {
        self.reconcile(
            tx_ref,
            Requester::User(buyer.context()),
            ReconcileTrigger::StatusPoll,
            Some(movie_id),
        )
        .await
    }

    pub async fn reconcile(
        &self,
        tx_ref: &TxRef,
        requester: Requester,
        trigger: ReconcileTrigger,
        expected_movie: Option<MovieId>,
    ) -> Result<ReconcileOutcome, PurchaseError> {
        self.state()
            .reconcile_handler()
            .handle(ReconcilePaymentCommand {
                tx_ref: tx_ref.clone(),
                requester,
                trigger,
                expected_movie,
            })
            .await
    }
}

pub fn viewer(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(id).expect("valid user id"),
        format!("{}@example.com", id),
        Some("Selam Tesfaye".to_string()),
        false,
    )
}

pub fn admin(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(id).expect("valid user id"),
        format!("{}@example.com", id),
        None,
        true,
    )
}
