//! Scripted payment gateway for tests.
//!
//! - Per-reference verification outcomes, with a default for the rest
//! - Queued initiate errors
//! - Call tracking for assertions

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::purchase::{TxRef, VerificationResult, VerifiedPayment};
use crate::ports::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway};

/// In-process `PaymentGateway` whose answers are set by the test.
pub struct MockPaymentGateway {
    state: Mutex<MockState>,
}

struct MockState {
    checkout_base: String,
    initiate_errors: VecDeque<GatewayError>,
    outcomes: HashMap<TxRef, VerificationResult>,
    default_outcome: VerificationResult,
    initiated: Vec<CheckoutRequest>,
    verify_calls: Vec<TxRef>,
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentGateway {
    /// Every initiate succeeds and every verify answers `Pending`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                checkout_base: "https://checkout.chapa.test/pay".to_string(),
                initiate_errors: VecDeque::new(),
                outcomes: HashMap::new(),
                default_outcome: VerificationResult::pending("not yet paid"),
                initiated: Vec::new(),
                verify_calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The next `initiate` call fails with `error`. Calls queue in order.
    pub fn fail_next_initiate(&self, error: GatewayError) {
        self.state().initiate_errors.push_back(error);
    }

    pub fn set_outcome(&self, tx_ref: &TxRef, outcome: VerificationResult) {
        self.state().outcomes.insert(tx_ref.clone(), outcome);
    }

    /// Make `tx_ref` verify as paid for exactly `payment.amount`.
    pub fn mark_paid(&self, payment: VerifiedPayment) {
        let tx_ref = payment.tx_ref.clone();
        self.set_outcome(&tx_ref, VerificationResult::Success(payment));
    }

    pub fn mark_failed(&self, tx_ref: &TxRef) {
        self.set_outcome(tx_ref, VerificationResult::failed("declined"));
    }

    pub fn set_default_outcome(&self, outcome: VerificationResult) {
        self.state().default_outcome = outcome;
    }

    /// Requests passed to `initiate`, in call order.
    pub fn initiated(&self) -> Vec<CheckoutRequest> {
        self.state().initiated.clone()
    }

    pub fn verify_count(&self, tx_ref: &TxRef) -> usize {
        self.state().verify_calls.iter().filter(|r| *r == tx_ref).count()
    }

    pub fn total_verify_count(&self) -> usize {
        self.state().verify_calls.len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initiate(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state();
        state.initiated.push(request.clone());
        if let Some(error) = state.initiate_errors.pop_front() {
            return Err(error);
        }
        Ok(CheckoutSession {
            checkout_url: format!("{}/{}", state.checkout_base, request.tx_ref),
        })
    }

    async fn verify(&self, tx_ref: &TxRef) -> VerificationResult {
        let mut state = self.state();
        state.verify_calls.push(tx_ref.clone());
        state
            .outcomes
            .get(tx_ref)
            .cloned()
            .unwrap_or_else(|| state.default_outcome.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Money;
    use crate::ports::Payer;

    fn request(tx_ref: &TxRef) -> CheckoutRequest {
        CheckoutRequest {
            tx_ref: tx_ref.clone(),
            amount: Money::etb(500),
            payer: Payer::from_display_name("a@b.c", None),
            callback_url: "https://app/cb".to_string(),
            return_url: "https://app/return".to_string(),
            title: "Movie".to_string(),
            description: "Movie access".to_string(),
        }
    }

    #[tokio::test]
    async fn queued_errors_fire_once() {
        let gateway = MockPaymentGateway::new();
        let tx_ref = TxRef::parse("tx_1_a").unwrap();
        gateway.fail_next_initiate(GatewayError::unavailable("down"));

        assert!(gateway.initiate(request(&tx_ref)).await.is_err());
        let session = gateway.initiate(request(&tx_ref)).await.unwrap();
        assert!(session.checkout_url.ends_with("tx_1_a"));
        assert_eq!(gateway.initiated().len(), 2);
    }

    #[tokio::test]
    async fn scripted_outcomes_and_call_count() {
        let gateway = MockPaymentGateway::new();
        let paid = TxRef::parse("tx_1_paid").unwrap();
        let other = TxRef::parse("tx_1_other").unwrap();
        gateway.mark_paid(VerifiedPayment {
            tx_ref: paid.clone(),
            amount: Money::etb(500),
            gateway_reference: None,
            paid_at: None,
        });

        assert_eq!(gateway.verify(&paid).await.label(), "success");
        assert_eq!(gateway.verify(&other).await.label(), "pending");
        assert_eq!(gateway.verify_count(&paid), 1);
        assert_eq!(gateway.total_verify_count(), 2);
    }
}
