//! End-to-end purchase flows against in-memory stores and a scripted gateway.

mod support;

use cinegate::application::handlers::{
    GetMovieAccessQuery, GetMovieStatesQuery, GetPaymentStatsQuery, ListPaymentHistoryQuery,
    RefundPaymentCommand,
};
use cinegate::domain::entitlement::{AccessType, SubscriptionPlan, SubscriptionStatus};
use cinegate::domain::foundation::{Money, MovieId};
use cinegate::domain::purchase::{
    PurchaseError, PurchaseSubject, ReportedStatus, TransactionStatus,
};
use cinegate::ports::{EntitlementStore, GatewayError, TransactionLedger};

use support::{admin, viewer, Harness, APP_BASE_URL};

// =============================================================================
// Scenario A: callback completes the purchase
// =============================================================================

#[tokio::test]
async fn scenario_a_callback_unlocks_movie() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");

    let started = h.buy_movie(&buyer).await;
    assert_eq!(started.transaction.amount, Money::etb(999));
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Pending), 1);
    assert!(started.checkout_url.ends_with(started.tx_ref.as_str()));

    let sent = h.gateway.initiated();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].callback_url, format!("{}/api/payment/callback", APP_BASE_URL));
    assert!(sent[0].return_url.contains(started.tx_ref.as_str()));
    assert_eq!(sent[0].payer.first_name, "Selam");

    h.gateway_pays(&started.transaction);
    let outcome = h.callback(&started.tx_ref).await.unwrap();

    assert_eq!(outcome.status, ReportedStatus::Success);
    assert!(outcome.entitlement_applied);
    let row = h.ledger.find_by_ref(&started.tx_ref).await.unwrap().unwrap();
    assert_eq!(row.status, TransactionStatus::Completed);
    assert!(row.completed_at.is_some());
    assert!(row.gateway_reference.is_some());

    let entitlement = h.entitlements.find(&buyer.id).await.unwrap();
    assert!(entitlement.unlocked_movies.contains(&h.movie.id));

    let access = h
        .state()
        .access_handler()
        .movie_access(GetMovieAccessQuery {
            user_id: buyer.id.clone(),
            movie_id: h.movie.id,
        })
        .await
        .unwrap();
    assert!(!access.is_locked);
    assert!(!access.is_blurred);
    assert_eq!(access.access_type, AccessType::Purchased);
}

// =============================================================================
// Scenario B: no callback, polls keep seeing pending
// =============================================================================

#[tokio::test]
async fn scenario_b_polls_stay_pending_without_side_effects() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;

    for _ in 0..3 {
        let outcome = h.poll(&buyer, h.movie.id, &started.tx_ref).await.unwrap();
        assert_eq!(outcome.status, ReportedStatus::Pending);
        assert!(!outcome.entitlement_applied);
    }

    assert!(h.entitlements.is_empty());
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Pending), 1);
    assert_eq!(h.gateway.verify_count(&started.tx_ref), 3);
}

// =============================================================================
// Scenario C: callback and poll race
// =============================================================================

#[tokio::test]
async fn scenario_c_racing_callback_and_poll_match_scenario_a() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);

    let (from_callback, from_poll) = tokio::join!(
        h.callback(&started.tx_ref),
        h.poll(&buyer, h.movie.id, &started.tx_ref),
    );

    assert_eq!(from_callback.unwrap().status, ReportedStatus::Success);
    assert_eq!(from_poll.unwrap().status, ReportedStatus::Success);
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Completed), 1);
    assert_eq!(h.ledger.all().len(), 1);
    let entitlement = h.entitlements.find(&buyer.id).await.unwrap();
    assert_eq!(entitlement.unlocked_movies.len(), 1);
}

// =============================================================================
// Initiation edge cases
// =============================================================================

#[tokio::test]
async fn gateway_refusal_rolls_back_pending_row() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    h.gateway.fail_next_initiate(GatewayError::unavailable("connect timeout"));

    let err = h
        .buy(&buyer, PurchaseSubject::Movie(h.movie.id))
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::GatewayUnavailable { .. }));
    assert!(h.ledger.all().is_empty());

    // The next attempt goes through normally
    h.buy_movie(&buyer).await;
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Pending), 1);
}

#[tokio::test]
async fn free_unknown_and_owned_movies_cannot_be_bought() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");

    let free = h.buy(&buyer, PurchaseSubject::Movie(h.free_movie.id)).await;
    assert!(matches!(free, Err(PurchaseError::InvalidState { .. })));

    let unknown = h.buy(&buyer, PurchaseSubject::Movie(MovieId::new())).await;
    assert!(matches!(unknown, Err(PurchaseError::NotFound { .. })));

    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);
    h.callback(&started.tx_ref).await.unwrap();

    let again = h.buy(&buyer, PurchaseSubject::Movie(h.movie.id)).await;
    assert!(matches!(again, Err(PurchaseError::InvalidState { .. })));
    assert!(h.gateway.initiated().len() == 1);
}

#[tokio::test]
async fn other_users_cannot_poll_a_transaction() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let stranger = viewer("viewer-2");
    let started = h.buy_movie(&buyer).await;

    let err = h
        .poll(&stranger, h.movie.id, &started.tx_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, PurchaseError::Unauthorized { .. }));

    // Wrong movie for the reference reads as not found
    let err = h
        .poll(&buyer, h.free_movie.id, &started.tx_ref)
        .await
        .unwrap_err();
    assert!(matches!(err, PurchaseError::NotFound { .. }));
    assert_eq!(h.gateway.total_verify_count(), 0);
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn premium_subscription_unlocks_paid_catalog() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");

    let started = h
        .buy(&buyer, PurchaseSubject::Subscription(SubscriptionPlan::Premium))
        .await
        .unwrap();
    assert!(started.tx_ref.as_str().starts_with("sub_"));
    assert_eq!(started.transaction.amount, Money::etb(29_900));

    h.gateway_pays(&started.transaction);
    h.callback(&started.tx_ref).await.unwrap();

    let entitlement = h.entitlements.find(&buyer.id).await.unwrap();
    let subscription = entitlement.subscription.expect("subscription set");
    assert_eq!(subscription.plan, SubscriptionPlan::Premium);
    assert_eq!(subscription.status, SubscriptionStatus::Active);

    let states = h
        .state()
        .access_handler()
        .movie_states(GetMovieStatesQuery {
            user_id: buyer.id.clone(),
        })
        .await
        .unwrap();
    assert!(states.values().all(|s| !s.is_locked));
}

#[tokio::test]
async fn basic_plan_does_not_unlock_paid_movies() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h
        .buy(&buyer, PurchaseSubject::Subscription(SubscriptionPlan::Basic))
        .await
        .unwrap();
    h.gateway_pays(&started.transaction);
    h.callback(&started.tx_ref).await.unwrap();

    let access = h
        .state()
        .access_handler()
        .movie_access(GetMovieAccessQuery {
            user_id: buyer.id.clone(),
            movie_id: h.movie.id,
        })
        .await
        .unwrap();
    assert!(access.is_locked);
    assert_eq!(access.access_type, AccessType::Locked);
}

// =============================================================================
// Refunds
// =============================================================================

#[tokio::test]
async fn refund_revokes_movie_and_is_reported_by_later_polls() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);
    h.callback(&started.tx_ref).await.unwrap();

    let refunded = h
        .state()
        .refund_handler()
        .handle(RefundPaymentCommand {
            actor: admin("ops-1").context(),
            tx_ref: started.tx_ref.clone(),
            reason: "charged twice".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(refunded.transaction.status, TransactionStatus::Refunded);
    assert!(refunded.access_revoked);
    assert!(!refunded.still_accessible_via_subscription);
    assert!(h
        .entitlements
        .find(&buyer.id)
        .await
        .unwrap()
        .unlocked_movies
        .is_empty());

    // A replayed callback must not re-grant
    let outcome = h.callback(&started.tx_ref).await.unwrap();
    assert_eq!(outcome.status, ReportedStatus::Refunded);
    assert!(h
        .entitlements
        .find(&buyer.id)
        .await
        .unwrap()
        .unlocked_movies
        .is_empty());
}

#[tokio::test]
async fn non_admin_cannot_refund() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");
    let started = h.buy_movie(&buyer).await;
    h.gateway_pays(&started.transaction);
    h.callback(&started.tx_ref).await.unwrap();

    let err = h
        .state()
        .refund_handler()
        .handle(RefundPaymentCommand {
            actor: buyer.context(),
            tx_ref: started.tx_ref.clone(),
            reason: "changed my mind".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::Unauthorized { .. }));
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Completed), 1);
}

// =============================================================================
// Reporting
// =============================================================================

#[tokio::test]
async fn history_and_stats_reflect_the_ledger() {
    let h = Harness::new();
    let buyer = viewer("viewer-1");

    let paid = h.buy_movie(&buyer).await;
    h.gateway_pays(&paid.transaction);
    h.callback(&paid.tx_ref).await.unwrap();

    let declined = h.buy_movie(&viewer("viewer-2")).await;
    h.gateway.mark_failed(&declined.tx_ref);
    h.callback(&declined.tx_ref).await.unwrap();

    h.buy_movie(&viewer("viewer-3")).await;

    let history = h
        .state()
        .history_handler()
        .handle(ListPaymentHistoryQuery {
            requester: buyer.context(),
            user_id: None,
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tx_ref, paid.tx_ref);

    let forbidden = h
        .state()
        .history_handler()
        .handle(ListPaymentHistoryQuery {
            requester: buyer.context(),
            user_id: Some(viewer("viewer-2").id),
        })
        .await;
    assert!(matches!(forbidden, Err(PurchaseError::Unauthorized { .. })));

    let stats = h
        .state()
        .stats_handler()
        .handle(GetPaymentStatsQuery {
            requester: admin("ops-1").context(),
            since: None,
        })
        .await
        .unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.paying_users, 1);
    assert_eq!(stats.revenue, vec![Money::etb(999)]);
}
