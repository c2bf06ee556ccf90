//! HTTP handlers for the payment and entitlement endpoints.
//!
//! These connect axum routes to the application layer handlers. None of
//! them touch the ledger or the entitlement store directly.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;

use crate::adapters::chapa::{verify_webhook_signature, SignatureError, SIGNATURE_HEADERS};
use crate::application::handlers::{
    CheckoutLinks, GetMovieAccessQuery, GetMovieStatesQuery, GetPaymentHandler, GetPaymentQuery,
    GetPaymentStatsHandler, GetPaymentStatsQuery, GetSubscriptionHandler, GetSubscriptionQuery,
    InitiatePurchaseCommand, InitiatePurchaseHandler, ListPaymentHistoryHandler,
    ListPaymentHistoryQuery, MovieAccessHandler, ReconcilePaymentCommand, ReconcilePaymentHandler,
    ReconcileTrigger, RefundPaymentCommand, RefundPaymentHandler, Requester,
};
use crate::domain::entitlement::SubscriptionPlan;
use crate::domain::foundation::{Currency, Money, MovieId, Timestamp, UserId};
use crate::domain::purchase::{PurchaseError, PurchaseSubject, TxRef};
use crate::ports::{EntitlementStore, MovieCatalog, PaymentGateway, TransactionLedger};

use super::super::middleware::RequireAuth;
use super::dto::{
    CallbackPayload, CheckoutResponse, ErrorResponse, HistoryQuery, InitiatePaymentRequest,
    InitiateSubscriptionRequest, MovieAccessResponse, MovieStatesResponse, PaymentHistoryResponse,
    PaymentStatsResponse, PaymentView, RefundRequest, RefundResponse, StatsQuery, StatusQuery,
    StatusResponse, SubscriptionResponse, VerifyQuery, VerifyResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment API. Handlers are built per request from
/// the Arc-wrapped ports.
#[derive(Clone)]
pub struct PaymentAppState {
    pub ledger: Arc<dyn TransactionLedger>,
    pub entitlements: Arc<dyn EntitlementStore>,
    pub catalog: Arc<dyn MovieCatalog>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub links: CheckoutLinks,
    /// When set, POST callbacks must carry a valid HMAC signature.
    pub webhook_secret: Option<SecretString>,
}

impl PaymentAppState {
    pub fn initiate_handler(&self) -> InitiatePurchaseHandler {
        InitiatePurchaseHandler::new(
            self.ledger.clone(),
            self.entitlements.clone(),
            self.catalog.clone(),
            self.gateway.clone(),
            self.links.clone(),
        )
    }

    pub fn reconcile_handler(&self) -> ReconcilePaymentHandler {
        ReconcilePaymentHandler::new(
            self.ledger.clone(),
            self.entitlements.clone(),
            self.catalog.clone(),
            self.gateway.clone(),
        )
    }

    pub fn refund_handler(&self) -> RefundPaymentHandler {
        RefundPaymentHandler::new(self.ledger.clone(), self.entitlements.clone())
    }

    pub fn history_handler(&self) -> ListPaymentHistoryHandler {
        ListPaymentHistoryHandler::new(self.ledger.clone())
    }

    pub fn payment_handler(&self) -> GetPaymentHandler {
        GetPaymentHandler::new(self.ledger.clone())
    }

    pub fn stats_handler(&self) -> GetPaymentStatsHandler {
        GetPaymentStatsHandler::new(self.ledger.clone())
    }

    pub fn access_handler(&self) -> MovieAccessHandler {
        MovieAccessHandler::new(self.entitlements.clone(), self.catalog.clone())
    }

    pub fn subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.entitlements.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Purchase initiation
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payment/initiate
pub async fn initiate_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let movie_id = parse_movie_id(&request.movie_id)?;
    let expected_amount = request.amount.as_ref().map(parse_amount).transpose()?;

    let result = state
        .initiate_handler()
        .handle(InitiatePurchaseCommand {
            buyer: user,
            subject: PurchaseSubject::Movie(movie_id),
            expected_amount,
            payer_email: request.email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            checkout_url: result.checkout_url,
            tx_ref: result.tx_ref.to_string(),
        }),
    ))
}

/// POST /api/subscription/initiate
pub async fn initiate_subscription(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<InitiateSubscriptionRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let plan: SubscriptionPlan = request
        .plan
        .parse()
        .map_err(|_| PurchaseError::validation("plan", "Unknown subscription plan"))?;

    let result = state
        .initiate_handler()
        .handle(InitiatePurchaseCommand {
            buyer: user,
            subject: PurchaseSubject::Subscription(plan),
            expected_amount: None,
            payer_email: request.email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            checkout_url: result.checkout_url,
            tx_ref: result.tx_ref.to_string(),
        }),
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// Reconciliation triggers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payment/callback
///
/// The body only names the transaction; its status field is never read.
pub async fn payment_callback(
    State(state): State<PaymentAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    if let Some(secret) = &state.webhook_secret {
        let provided = SIGNATURE_HEADERS
            .iter()
            .find_map(|name| headers.get(*name))
            .and_then(|v| v.to_str().ok());
        verify_webhook_signature(secret, &body, provided).map_err(|e| {
            tracing::warn!(error = %e, "Rejected gateway callback with bad signature");
            PaymentApiError::Signature(e)
        })?;
    }

    let payload: CallbackPayload = if body.is_empty() {
        CallbackPayload::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| PurchaseError::validation("body", "Callback body is not valid JSON"))?
    };

    reconcile_from_callback(&state, payload).await
}

/// GET /api/payment/callback
///
/// Redirect-style notification. Unsigned, and safe to accept because it
/// only triggers a server-side verify.
pub async fn payment_callback_redirect(
    State(state): State<PaymentAppState>,
    Query(payload): Query<CallbackPayload>,
) -> Result<impl IntoResponse, PaymentApiError> {
    reconcile_from_callback(&state, payload).await
}

async fn reconcile_from_callback(
    state: &PaymentAppState,
    payload: CallbackPayload,
) -> Result<Json<StatusResponse>, PaymentApiError> {
    let tx_ref = parse_tx_ref(payload.reference())?;
    tracing::info!(tx_ref = %tx_ref, "Gateway callback received");

    let outcome = state
        .reconcile_handler()
        .handle(ReconcilePaymentCommand {
            tx_ref,
            requester: Requester::Gateway,
            trigger: ReconcileTrigger::Callback,
            expected_movie: None,
        })
        .await?;

    Ok(Json(StatusResponse {
        status: outcome.status,
    }))
}

/// GET /api/payment/status?movieId=&tx_ref=
pub async fn payment_status(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let movie_id = query
        .movie_id
        .as_deref()
        .ok_or_else(|| PurchaseError::validation("movieId", "movieId is required"))
        .and_then(parse_movie_id)?;
    let tx_ref = parse_tx_ref(query.tx_ref.as_deref())?;

    let outcome = state
        .reconcile_handler()
        .handle(ReconcilePaymentCommand {
            tx_ref,
            requester: Requester::User(user.context()),
            trigger: ReconcileTrigger::StatusPoll,
            expected_movie: Some(movie_id),
        })
        .await?;

    Ok(Json(StatusResponse {
        status: outcome.status,
    }))
}

/// GET /api/payment/verify?tx_ref=
pub async fn verify_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let tx_ref = parse_tx_ref(query.tx_ref.as_deref())?;

    let outcome = state
        .reconcile_handler()
        .handle(ReconcilePaymentCommand {
            tx_ref,
            requester: Requester::User(user.context()),
            trigger: ReconcileTrigger::VerifyOnReturn,
            expected_movie: None,
        })
        .await?;

    Ok(Json(VerifyResponse::new(outcome.status, &outcome.transaction)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Read models
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/user/payments
pub async fn payment_history(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let user_id = query
        .user_id
        .map(UserId::new)
        .transpose()
        .map_err(|_| PurchaseError::validation("userId", "userId must not be empty"))?;

    let transactions = state
        .history_handler()
        .handle(ListPaymentHistoryQuery {
            requester: user.context(),
            user_id,
        })
        .await?;

    Ok(Json(PaymentHistoryResponse {
        payments: transactions.iter().map(PaymentView::from).collect(),
    }))
}

/// GET /api/user/payments/:tx_ref
pub async fn payment_detail(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Path(tx_ref): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let tx_ref = parse_tx_ref(Some(&tx_ref))?;
    let transaction = state
        .payment_handler()
        .handle(GetPaymentQuery {
            requester: user.context(),
            tx_ref,
        })
        .await?;

    Ok(Json(PaymentView::from(&transaction)))
}

/// GET /api/user/subscription
pub async fn user_subscription(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, PaymentApiError> {
    let overview = state
        .subscription_handler()
        .handle(GetSubscriptionQuery { user_id: user.id })
        .await?;

    Ok(Json(SubscriptionResponse::from(overview)))
}

/// GET /api/movies/:id/access
pub async fn movie_access(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Path(movie_id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let movie_id = parse_movie_id(&movie_id)?;
    let access = state
        .access_handler()
        .movie_access(GetMovieAccessQuery {
            user_id: user.id,
            movie_id,
        })
        .await?;

    Ok(Json(MovieAccessResponse::from(access)))
}

/// GET /api/user/movie-states
pub async fn movie_states(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, PaymentApiError> {
    let states = state
        .access_handler()
        .movie_states(GetMovieStatesQuery { user_id: user.id })
        .await?;

    Ok(Json(MovieStatesResponse {
        states: states
            .into_iter()
            .map(|(id, lock)| (id.to_string(), lock))
            .collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/payments/refund
pub async fn refund_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<RefundRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let tx_ref = parse_tx_ref(Some(&request.tx_ref))?;

    let result = state
        .refund_handler()
        .handle(RefundPaymentCommand {
            actor: user.context(),
            tx_ref,
            reason: request.reason,
        })
        .await?;

    Ok(Json(RefundResponse::from(result)))
}

/// GET /api/admin/payments/stats?since=
pub async fn payment_stats(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let since = query
        .since
        .as_deref()
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| Timestamp::from_datetime(dt.with_timezone(&chrono::Utc)))
                .map_err(|_| {
                    PurchaseError::validation("since", "since must be an RFC 3339 timestamp")
                })
        })
        .transpose()?;

    let summary = state
        .stats_handler()
        .handle(GetPaymentStatsQuery {
            requester: user.context(),
            since,
        })
        .await?;

    Ok(Json(PaymentStatsResponse::from(summary)))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

// ════════════════════════════════════════════════════════════════════════════════
// Input parsing
// ════════════════════════════════════════════════════════════════════════════════

fn parse_movie_id(raw: &str) -> Result<MovieId, PurchaseError> {
    raw.trim()
        .parse()
        .map_err(|_| PurchaseError::validation("movieId", "movieId must be a UUID"))
}

fn parse_tx_ref(raw: Option<&str>) -> Result<TxRef, PurchaseError> {
    let raw = raw.ok_or_else(|| PurchaseError::validation("tx_ref", "tx_ref is required"))?;
    TxRef::parse(raw).map_err(|e| PurchaseError::validation("tx_ref", e.to_string()))
}

/// Accepts `9.99` or `"9.99"`.
fn parse_amount(raw: &serde_json::Value) -> Result<Money, PurchaseError> {
    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => return Err(PurchaseError::validation("amount", "amount must be a number")),
    };
    Money::parse_decimal(&text, Currency::etb())
        .map_err(|e| PurchaseError::validation("amount", e.to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper for the payment endpoints.
#[derive(Debug)]
pub enum PaymentApiError {
    Purchase(PurchaseError),
    Signature(SignatureError),
}

impl From<PurchaseError> for PaymentApiError {
    fn from(err: PurchaseError) -> Self {
        PaymentApiError::Purchase(err)
    }
}

impl From<crate::domain::foundation::DomainError> for PaymentApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        PaymentApiError::Purchase(PurchaseError::from(err))
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let err = match self {
            PaymentApiError::Signature(e) => {
                let body = ErrorResponse::new("INVALID_SIGNATURE", e.to_string());
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            PaymentApiError::Purchase(err) => err,
        };

        let status = match &err {
            PurchaseError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            PurchaseError::NotFound { .. } => StatusCode::NOT_FOUND,
            PurchaseError::GatewayUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PurchaseError::GatewayRejected { .. } => StatusCode::BAD_GATEWAY,
            PurchaseError::InvalidState { .. } | PurchaseError::ValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            PurchaseError::DuplicateReference(_)
            | PurchaseError::Inconsistent { .. }
            | PurchaseError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = match &err {
            PurchaseError::NotFound { id, .. } => Some(serde_json::json!({ "id": id })),
            PurchaseError::ValidationFailed { field, .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            PurchaseError::Inconsistent { tx_ref, .. } => {
                Some(serde_json::json!({ "tx_ref": tx_ref }))
            }
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(code = %err.code(), error = %err, "Payment request failed");
        }

        // Internals stay in the logs.
        let message = match &err {
            PurchaseError::Infrastructure(_) | PurchaseError::DuplicateReference(_) => {
                "Internal error, please try again".to_string()
            }
            other => other.message(),
        };

        let mut body = ErrorResponse::new(err.code().to_string(), message);
        if let Some(details) = details {
            body = body.with_details(details);
        }
        (status, Json(body)).into_response()
    }
}
