//! Axum router for the payment and entitlement endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::super::middleware::{auth_middleware, AuthState};
use super::handlers::{
    health, initiate_payment, initiate_subscription, movie_access, movie_states,
    payment_callback, payment_callback_redirect, payment_detail, payment_history, payment_stats,
    payment_status, refund_payment, user_subscription, verify_payment, PaymentAppState,
};

/// Routes under `/api`.
///
/// ## User endpoints (Bearer token)
/// - `POST /payment/initiate`, `POST /subscription/initiate`
/// - `GET /payment/status`, `GET /payment/verify`
/// - `GET /user/payments`, `GET /user/payments/:tx_ref`, `GET /user/subscription`
/// - `GET /user/movie-states`, `GET /movies/:id/access`
///
/// ## Gateway endpoints (signature, no session)
/// - `POST /payment/callback`, `GET /payment/callback`
///
/// ## Admin endpoints
/// - `POST /admin/payments/refund`, `GET /admin/payments/stats`
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/payment/initiate", post(initiate_payment))
        .route("/subscription/initiate", post(initiate_subscription))
        .route(
            "/payment/callback",
            post(payment_callback).get(payment_callback_redirect),
        )
        .route("/payment/status", get(payment_status))
        .route("/payment/verify", get(verify_payment))
        .route("/user/payments", get(payment_history))
        .route("/user/payments/:tx_ref", get(payment_detail))
        .route("/user/subscription", get(user_subscription))
        .route("/user/movie-states", get(movie_states))
        .route("/movies/:id/access", get(movie_access))
        .route("/admin/payments/refund", post(refund_payment))
        .route("/admin/payments/stats", get(payment_stats))
}

/// The complete application router: `/api/*` behind the auth middleware,
/// plus `/health`.
///
/// ```ignore
/// let app = app_router(state, Arc::new(JwtSessionValidator::new(jwt_config)))
///     .layer(TraceLayer::new_for_http());
/// ```
pub fn app_router(state: PaymentAppState, validator: AuthState) -> Router {
    Router::new()
        .nest("/api", payment_routes())
        .layer(middleware::from_fn_with_state(validator, auth_middleware))
        .route("/health", get(health))
        .with_state(state)
}
