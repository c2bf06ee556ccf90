//! Request and response bodies for the payment and entitlement API.
//!
//! Field names follow what the web client already sends: `movieId`,
//! `checkoutUrl`, but `tx_ref` in snake case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::handlers::{MovieLockState, RefundPaymentResult, SubscriptionOverview};
use crate::domain::entitlement::{AccessType, MovieAccess};
use crate::domain::foundation::Money;
use crate::domain::purchase::{LedgerSummary, ReportedStatus, Transaction};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payment/initiate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub movie_id: String,
    /// Client-side price, either `9.99` or `"9.99"`. Must match the catalog.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/subscription/initiate
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateSubscriptionRequest {
    pub plan: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Gateway callback, as JSON body or query string. Chapa uses `trx_ref`
/// on redirects and `tx_ref` in webhook bodies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackPayload {
    #[serde(default)]
    pub tx_ref: Option<String>,
    #[serde(default)]
    pub trx_ref: Option<String>,
}

impl CallbackPayload {
    pub fn reference(&self) -> Option<&str> {
        self.tx_ref
            .as_deref()
            .or(self.trx_ref.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// GET /api/payment/status
#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "movieId", default)]
    pub movie_id: Option<String>,
    #[serde(default)]
    pub tx_ref: Option<String>,
}

/// GET /api/payment/verify
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub tx_ref: Option<String>,
}

/// GET /api/user/payments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    /// Admins may look at another user's history.
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// POST /api/admin/payments/refund
#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub tx_ref: String,
    #[serde(default)]
    pub reason: String,
}

/// GET /api/admin/payments/stats
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    /// RFC 3339 lower bound on `created_at`.
    #[serde(default)]
    pub since: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "checkoutUrl")]
    pub checkout_url: String,
    pub tx_ref: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: ReportedStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub status: ReportedStatus,
    pub tx_ref: String,
    #[serde(rename = "movieId", skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

impl VerifyResponse {
    pub fn new(status: ReportedStatus, transaction: &Transaction) -> Self {
        Self {
            success: status.is_success(),
            status,
            tx_ref: transaction.tx_ref.to_string(),
            movie_id: transaction.subject.movie_id().map(|id| id.to_string()),
            plan: transaction.subject.plan().map(|p| p.as_str().to_string()),
        }
    }
}

/// One ledger row as the user and admin screens show it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub tx_ref: String,
    pub subject_type: String,
    pub subject_id: String,
    /// Decimal string, e.g. `"9.99"`.
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
}

impl From<&Transaction> for PaymentView {
    fn from(tx: &Transaction) -> Self {
        Self {
            tx_ref: tx.tx_ref.to_string(),
            subject_type: tx.subject.subject_type().as_str().to_string(),
            subject_id: tx.subject.subject_id(),
            amount: tx.amount.to_decimal_string(),
            currency: tx.amount.currency.to_string(),
            status: tx.status.as_str().to_string(),
            created_at: tx.created_at.as_datetime().to_rfc3339(),
            completed_at: tx.completed_at.map(|t| t.as_datetime().to_rfc3339()),
            refunded_at: tx
                .refund
                .as_ref()
                .map(|r| r.refunded_at.as_datetime().to_rfc3339()),
            refund_reason: tx.refund.as_ref().map(|r| r.reason.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentHistoryResponse {
    pub payments: Vec<PaymentView>,
}

/// A user who never subscribed reads as `free` / `inactive` with null dates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub plan: String,
    pub status: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub auto_renew: bool,
    pub unlocks_paid_movies: bool,
}

impl From<SubscriptionOverview> for SubscriptionResponse {
    fn from(overview: SubscriptionOverview) -> Self {
        let status = overview.status.as_str().to_string();
        match overview.subscription {
            Some(sub) => Self {
                plan: sub.plan.as_str().to_string(),
                status,
                start_date: Some(sub.start_date.as_datetime().to_rfc3339()),
                end_date: Some(sub.end_date.as_datetime().to_rfc3339()),
                auto_renew: sub.auto_renew,
                unlocks_paid_movies: overview.unlocks_paid_movies,
            },
            None => Self {
                plan: "free".to_string(),
                status,
                start_date: None,
                end_date: None,
                auto_renew: false,
                unlocks_paid_movies: false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieAccessResponse {
    pub movie_id: String,
    pub is_locked: bool,
    pub is_blurred: bool,
    pub access_type: AccessType,
}

impl From<MovieAccess> for MovieAccessResponse {
    fn from(access: MovieAccess) -> Self {
        Self {
            movie_id: access.movie_id.to_string(),
            is_locked: access.is_locked,
            is_blurred: access.is_blurred,
            access_type: access.access_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieStatesResponse {
    pub states: BTreeMap<String, MovieLockState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub message: String,
    pub transaction: PaymentView,
    pub access_revoked: bool,
    pub still_accessible_via_subscription: bool,
}

impl From<RefundPaymentResult> for RefundResponse {
    fn from(result: RefundPaymentResult) -> Self {
        Self {
            message: format!("Transaction {} refunded", result.transaction.tx_ref),
            transaction: PaymentView::from(&result.transaction),
            access_revoked: result.access_revoked,
            still_accessible_via_subscription: result.still_accessible_via_subscription,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AmountView {
    pub amount: String,
    pub currency: String,
}

impl From<&Money> for AmountView {
    fn from(money: &Money) -> Self {
        Self {
            amount: money.to_decimal_string(),
            currency: money.currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatsResponse {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
    pub refunded: u64,
    pub revenue: Vec<AmountView>,
    pub refunded_total: Vec<AmountView>,
    pub paying_users: u64,
}

impl From<LedgerSummary> for PaymentStatsResponse {
    fn from(summary: LedgerSummary) -> Self {
        Self {
            total: summary.total(),
            pending: summary.pending,
            completed: summary.completed,
            failed: summary.failed,
            refunded: summary.refunded,
            revenue: summary.revenue.iter().map(AmountView::from).collect(),
            refunded_total: summary.refunded_total.iter().map(AmountView::from).collect(),
            paying_users: summary.paying_users,
        }
    }
}

/// Error body: `{error, details?, code}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            code: code.into(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
