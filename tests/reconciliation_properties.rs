//! Properties of reconciliation that must hold whatever order the
//! callback, status polls and verify-on-return arrive in.

mod support;

use futures::future::join_all;
use proptest::prelude::*;

use cinegate::application::handlers::{RefundPaymentCommand, ReconcileTrigger, Requester};
use cinegate::domain::foundation::{Money, Timestamp};
use cinegate::domain::purchase::{
    PurchaseError, ReportedStatus, SubjectType, TransactionStatus, TxRef, VerificationResult,
    VerifiedPayment,
};
use cinegate::ports::{EntitlementStore, TransactionLedger};

use support::{admin, viewer, Harness};

// =============================================================================
// Idempotent completion
// =============================================================================

async fn concurrent_reconciles(n: usize) {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);

    let calls = (0..n).map(|i| {
        let trigger = match i % 3 {
            0 => ReconcileTrigger::Callback,
            1 => ReconcileTrigger::StatusPoll,
            _ => ReconcileTrigger::VerifyOnReturn,
        };
        h.reconcile(&started.tx_ref, Requester::Gateway, trigger, None)
    });
    let outcomes = join_all(calls).await;

    for outcome in outcomes {
        assert_eq!(outcome.expect("reconcile").status, ReportedStatus::Success);
    }
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Completed), 1);
    assert_eq!(h.ledger.all().len(), 1);

    let entitlement = h.entitlements.find(&buyer.id).await.unwrap();
    assert_eq!(entitlement.unlocked_movies.len(), 1);
    assert!(entitlement.unlocked_movies.contains(&h.movie.id));
}

#[tokio::test]
async fn single_reconcile_completes_and_grants() {
    concurrent_reconciles(1).await;
}

#[tokio::test]
async fn many_concurrent_reconciles_collapse_into_one_completion() {
    concurrent_reconciles(25).await;
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn completion_is_idempotent_for_any_fan_out(n in 1usize..12) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(concurrent_reconciles(n));
    }
}

#[tokio::test]
async fn settled_rows_are_answered_without_the_gateway() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);

    h.callback(&started.tx_ref).await.unwrap();
    h.callback(&started.tx_ref).await.unwrap();
    h.poll(&buyer, h.movie.id, &started.tx_ref).await.unwrap();

    assert_eq!(h.gateway.verify_count(&started.tx_ref), 1);
}

// =============================================================================
// Failure non-downgrade
// =============================================================================

#[tokio::test]
async fn completed_transaction_is_never_marked_failed() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);
    h.callback(&started.tx_ref).await.unwrap();

    let after = h.ledger.mark_failed(&started.tx_ref).await.unwrap();
    assert_eq!(after.status, TransactionStatus::Completed);

    // A late "failed" from the gateway is never even consulted
    h.gateway.mark_failed(&started.tx_ref);
    let outcome = h.callback(&started.tx_ref).await.unwrap();
    assert_eq!(outcome.status, ReportedStatus::Success);
}

// =============================================================================
// Transport-error safety
// =============================================================================

#[tokio::test]
async fn unreachable_gateway_leaves_transaction_pending() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway.set_outcome(
        &started.tx_ref,
        VerificationResult::pending("transport error: connection reset"),
    );

    for _ in 0..3 {
        let outcome = h.poll(&buyer, h.movie.id, &started.tx_ref).await.unwrap();
        assert_eq!(outcome.status, ReportedStatus::Pending);
    }

    let row = h.ledger.find_by_ref(&started.tx_ref).await.unwrap().unwrap();
    assert_eq!(row.status, TransactionStatus::Pending);
    assert_eq!(h.gateway.verify_count(&started.tx_ref), 3);
    assert!(h.entitlements.is_empty());
}

#[tokio::test]
async fn amount_mismatch_is_not_completed() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway.mark_paid(VerifiedPayment {
        tx_ref: started.tx_ref.clone(),
        amount: Money::etb(1),
        gateway_reference: None,
        paid_at: None,
    });

    let outcome = h.callback(&started.tx_ref).await.unwrap();
    assert_eq!(outcome.status, ReportedStatus::Pending);
    assert!(h.entitlements.is_empty());
}

// =============================================================================
// Refund precondition
// =============================================================================

#[tokio::test]
async fn refund_of_unsettled_transactions_is_invalid_state() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let refunds = h.state().refund_handler();
    let actor = admin("ops-1").context();

    let pending = h.buy_movie(&buyer).await;
    let failed = h.buy_movie(&buyer).await;
    h.gateway.mark_failed(&failed.tx_ref);
    h.callback(&failed.tx_ref).await.unwrap();

    for tx_ref in [&pending.tx_ref, &failed.tx_ref] {
        let err = refunds
            .handle(RefundPaymentCommand {
                actor: actor.clone(),
                tx_ref: tx_ref.clone(),
                reason: "customer request".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::InvalidState { .. }), "{:?}", err);
    }

    assert!(h.entitlements.is_empty());
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Refunded), 0);
}

// =============================================================================
// Unique reference
// =============================================================================

#[tokio::test]
async fn concurrent_initiates_never_collide() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");

    let started = join_all((0..20).map(|_| h.buy_movie(&buyer))).await;

    let mut refs: Vec<&TxRef> = started.iter().map(|s| &s.tx_ref).collect();
    refs.sort();
    refs.dedup();
    assert_eq!(refs.len(), 20);
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Pending), 20);
}

proptest! {
    #[test]
    fn same_instant_references_are_distinct(millis in 0i64..4_000_000_000_000) {
        let now = Timestamp::from_unix_millis(millis).unwrap();
        let a = TxRef::generate(SubjectType::Movie, now);
        let b = TxRef::generate(SubjectType::Movie, now);
        prop_assert_ne!(a, b);
    }
}

// =============================================================================
// Status monotonicity across arbitrary gateway answers
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Answer {
    Paid,
    Declined,
    Unknown,
}

fn answer() -> impl Strategy<Value = Answer> {
    prop_oneof![Just(Answer::Paid), Just(Answer::Declined), Just(Answer::Unknown)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn first_explicit_answer_wins(answers in proptest::collection::vec(answer(), 1..8)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (expected, observed) = rt.block_on(async {
            let h = Harness::new();
            let buyer = viewer("viewer-1");
            let started = h.buy_movie(&buyer).await;

            let mut first_terminal = None;
            for a in &answers {
                match a {
                    Answer::Paid => h.gateway_pays(&started.transaction),
                    Answer::Declined => h.gateway.mark_failed(&started.tx_ref),
                    Answer::Unknown => h.gateway.set_outcome(
                        &started.tx_ref,
                        VerificationResult::pending("timeout"),
                    ),
                }
                let status = h.callback(&started.tx_ref).await.unwrap().status;
                if first_terminal.is_none() && status != ReportedStatus::Pending {
                    first_terminal = Some(status);
                }
                if let Some(terminal) = first_terminal {
                    assert_eq!(status, terminal);
                }
            }

            let row = h.ledger.find_by_ref(&started.tx_ref).await.unwrap().unwrap();
            (first_terminal.unwrap_or(ReportedStatus::Pending), row.status.reported())
        });

        prop_assert_eq!(expected, observed);
    }
}
