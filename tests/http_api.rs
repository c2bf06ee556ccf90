//! HTTP surface: routing, auth, status mapping and callback signatures.

mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use cinegate::adapters::auth::MockSessionValidator;
use cinegate::adapters::chapa::sign_hex;
use cinegate::adapters::http::{app_router, PaymentAppState};
use cinegate::domain::foundation::AuthError;
use cinegate::domain::purchase::TransactionStatus;
use cinegate::ports::{EntitlementStore, TransactionLedger};

use support::Harness;

const VIEWER_TOKEN: &str = "viewer-token";
const STRANGER_TOKEN: &str = "stranger-token";
const ADMIN_TOKEN: &str = "admin-token";
const WEBHOOK_SECRET: &str = "whsec-test";

// =============================================================================
// Test Infrastructure
// =============================================================================

fn validator() -> MockSessionValidator {
    MockSessionValidator::new()
        .with_test_user(VIEWER_TOKEN, "viewer-1")
        .and_then(|v| v.with_test_user(STRANGER_TOKEN, "viewer-2"))
        .and_then(|v| v.with_test_admin(ADMIN_TOKEN, "ops-1"))
        .unwrap()
}

fn app(h: &Harness) -> Router {
    app_router(h.state(), Arc::new(validator()))
}

fn signed_app(h: &Harness) -> Router {
    let state = PaymentAppState {
        webhook_secret: Some(SecretString::new(WEBHOOK_SECRET.to_string())),
        ..h.state()
    };
    app_router(state, Arc::new(validator()))
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

async fn initiate(h: &Harness) -> String {
    let (status, body) = send(
        app(h),
        post_json(
            "/api/payment/initiate",
            Some(VIEWER_TOKEN),
            &json!({ "movieId": h.movie.id.to_string(), "amount": "9.99" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["tx_ref"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and auth
// =============================================================================

#[tokio::test]
async fn health_needs_no_session() {
    let h = Harness::new();
    let (status, body) = send(app(&h), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn user_endpoints_require_a_session() {
    let h = Harness::new();
    let (status, body) = send(app(&h), get("/api/user/payments", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = send(app(&h), get("/api/user/payments", Some("bogus"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_backend_outage_is_503() {
    let h = Harness::new();
    let validator = validator().with_error(AuthError::service_unavailable("jwks down"));
    let app = app_router(h.state(), Arc::new(validator));

    let (status, _) = send(app, get("/api/user/payments", Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn admin_endpoints_reject_viewers() {
    let h = Harness::new();
    let (status, body) = send(app(&h), get("/api/admin/payments/stats", Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, body) = send(app(&h), get("/api/admin/payments/stats", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

// =============================================================================
// Purchase flow over HTTP
// =============================================================================

#[tokio::test]
async fn initiate_returns_checkout_and_records_pending() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;

    assert!(tx_ref.starts_with("tx_"));
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Pending), 1);
    let sent = h.gateway.initiated();
    assert_eq!(sent[0].payer.email, "viewer-1@test.example.com");
}

#[tokio::test]
async fn initiate_validates_input() {
    let h = Harness::new();

    let (status, body) = send(
        app(&h),
        post_json("/api/payment/initiate", Some(VIEWER_TOKEN), &json!({ "movieId": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, _) = send(
        app(&h),
        post_json(
            "/api/payment/initiate",
            Some(VIEWER_TOKEN),
            &json!({ "movieId": h.movie.id.to_string(), "amount": "1.00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(&h),
        post_json(
            "/api/payment/initiate",
            Some(VIEWER_TOKEN),
            &json!({ "movieId": uuid::Uuid::new_v4().to_string() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.ledger.all().is_empty());
}

#[tokio::test]
async fn callback_then_status_reports_success() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    let tx = h.ledger.all().remove(0);
    h.gateway_pays(&tx);

    let (status, body) = send(
        app(&h),
        post_json("/api/payment/callback", None, &json!({ "tx_ref": tx_ref })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let uri = format!("/api/payment/status?movieId={}&tx_ref={}", h.movie.id, tx_ref);
    let (status, body) = send(app(&h), get(&uri, Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let viewer = tx.user_id.clone();
    let entitlement = h.entitlements.find(&viewer).await.unwrap();
    assert!(entitlement.unlocked_movies.contains(&h.movie.id));

    let uri = format!("/api/movies/{}/access", h.movie.id);
    let (status, body) = send(app(&h), get(&uri, Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLocked"], false);
    assert_eq!(body["accessType"], "purchased");
}

#[tokio::test]
async fn pending_callback_is_still_2xx() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;

    let uri = format!("/api/payment/callback?trx_ref={}", tx_ref);
    let (status, body) = send(app(&h), get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn unknown_callback_reference_is_404() {
    let h = Harness::new();
    let (status, body) = send(
        app(&h),
        post_json("/api/payment/callback", None, &json!({ "tx_ref": "tx_1_unknown" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TRANSACTION_NOT_FOUND");
}

#[tokio::test]
async fn verify_on_return_reports_success_flag() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    h.gateway_pays(&h.ledger.all()[0]);

    let uri = format!("/api/payment/verify?tx_ref={}", tx_ref);
    let (status, body) = send(app(&h), get(&uri, Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["movieId"], h.movie.id.to_string());
}

#[tokio::test]
async fn other_users_transactions_are_forbidden() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;

    let uri = format!("/api/payment/verify?tx_ref={}", tx_ref);
    let (status, _) = send(app(&h), get(&uri, Some(STRANGER_TOKEN))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn movie_states_cover_the_catalog() {
    let h = Harness::new();
    let (status, body) = send(app(&h), get("/api/user/movie-states", Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);

    let states = body["states"].as_object().unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[&h.movie.id.to_string()]["isLocked"], true);
    assert_eq!(states[&h.free_movie.id.to_string()]["isLocked"], false);
}

#[tokio::test]
async fn payment_detail_is_for_owner_or_admin() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    let uri = format!("/api/user/payments/{}", tx_ref);

    let (status, body) = send(app(&h), get(&uri, Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["txRef"], tx_ref);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["amount"], "9.99");

    let (status, body) = send(app(&h), get(&uri, Some(STRANGER_TOKEN))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("txRef").is_none());

    let (status, body) = send(app(&h), get(&uri, Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["txRef"], tx_ref);

    let (status, body) = send(
        app(&h),
        get("/api/user/payments/tx_1_unknown", Some(VIEWER_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TRANSACTION_NOT_FOUND");

    let (status, _) = send(app(&h), get(&uri, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn payment_detail_does_not_verify_pending() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    h.gateway_pays(&h.ledger.all()[0]);

    let uri = format!("/api/user/payments/{}", tx_ref);
    let (status, body) = send(app(&h), get(&uri, Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(h.ledger.count_with_status(TransactionStatus::Pending), 1);
}

#[tokio::test]
async fn subscription_defaults_to_free_inactive() {
    let h = Harness::new();
    let (status, body) = send(app(&h), get("/api/user/subscription", Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["status"], "inactive");
    assert!(body["startDate"].is_null());
    assert!(body["endDate"].is_null());
    assert_eq!(body["autoRenew"], false);
}

#[tokio::test]
async fn paid_subscription_shows_as_active() {
    let h = Harness::new();
    let (status, body) = send(
        app(&h),
        post_json("/api/subscription/initiate", Some(VIEWER_TOKEN), &json!({ "plan": "premium" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let tx_ref = body["tx_ref"].as_str().unwrap().to_string();
    h.gateway_pays(&h.ledger.all()[0]);

    let (status, _) = send(
        app(&h),
        post_json("/api/payment/callback", None, &json!({ "tx_ref": tx_ref })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app(&h), get("/api/user/subscription", Some(VIEWER_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "premium");
    assert_eq!(body["status"], "active");
    assert!(body["startDate"].is_string());
    assert!(body["endDate"].is_string());
    assert_eq!(body["unlocksPaidMovies"], true);

    let (_, body) = send(app(&h), get("/api/user/subscription", Some(STRANGER_TOKEN))).await;
    assert_eq!(body["status"], "inactive");
}

// =============================================================================
// Callback signatures
// =============================================================================

#[tokio::test]
async fn signed_callback_is_accepted() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    let body = json!({ "tx_ref": tx_ref }).to_string();
    let signature = sign_hex(
        &SecretString::new(WEBHOOK_SECRET.to_string()),
        body.as_bytes(),
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/payment/callback")
        .header(header::CONTENT_TYPE, "application/json")
        .header("chapa-signature", signature)
        .body(Body::from(body))
        .unwrap();
    let (status, response) = send(signed_app(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "pending");
}

#[tokio::test]
async fn unsigned_or_forged_callback_is_401() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    let payload = json!({ "tx_ref": tx_ref });

    let (status, body) = send(
        signed_app(&h),
        post_json("/api/payment/callback", None, &payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_SIGNATURE");

    let forged = Request::builder()
        .method(Method::POST)
        .uri("/api/payment/callback")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-chapa-signature", "00".repeat(32))
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _) = send(signed_app(&h), forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.gateway.total_verify_count(), 0);
}

// =============================================================================
// Admin refund
// =============================================================================

#[tokio::test]
async fn admin_refund_round_trip() {
    let h = Harness::new();
    let tx_ref = initiate(&h).await;
    h.gateway_pays(&h.ledger.all()[0]);
    send(
        app(&h),
        post_json("/api/payment/callback", None, &json!({ "tx_ref": tx_ref })),
    )
    .await;

    let refund = json!({ "tx_ref": tx_ref, "reason": "duplicate charge" });
    let (status, _) = send(
        app(&h),
        post_json("/api/admin/payments/refund", Some(VIEWER_TOKEN), &refund),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app(&h),
        post_json("/api/admin/payments/refund", Some(ADMIN_TOKEN), &refund),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transaction"]["status"], "refunded");
    assert_eq!(body["accessRevoked"], true);

    let (status, body) = send(
        app(&h),
        post_json("/api/admin/payments/refund", Some(ADMIN_TOKEN), &refund),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");
}
