//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod entitlement;
pub mod purchase;

pub use entitlement::{
    GetMovieAccessQuery, GetMovieStatesQuery, GetSubscriptionHandler, GetSubscriptionQuery,
    MovieAccessHandler, MovieLockState, SubscriptionOverview,
};
pub use purchase::{
    CheckoutLinks, GetPaymentHandler, GetPaymentQuery, GetPaymentStatsHandler,
    GetPaymentStatsQuery, InitiatePurchaseCommand, InitiatePurchaseHandler,
    InitiatePurchaseResult, ListPaymentHistoryHandler, ListPaymentHistoryQuery, ReconcileOutcome,
    ReconcilePaymentCommand, ReconcilePaymentHandler, ReconcileTrigger, RefundPaymentCommand,
    RefundPaymentHandler, RefundPaymentResult, Requester,
};
