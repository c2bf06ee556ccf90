//! Purchase flow handlers: initiation, reconciliation, refunds and reporting.

mod get_payment;
mod initiate_purchase;
mod list_payment_history;
mod payment_stats;
mod reconcile_payment;
mod refund_payment;

pub use get_payment::{GetPaymentHandler, GetPaymentQuery};
pub use initiate_purchase::{
    CheckoutLinks, InitiatePurchaseCommand, InitiatePurchaseHandler, InitiatePurchaseResult,
};
pub use list_payment_history::{ListPaymentHistoryHandler, ListPaymentHistoryQuery};
pub use payment_stats::{GetPaymentStatsHandler, GetPaymentStatsQuery};
pub use reconcile_payment::{
    ReconcileOutcome, ReconcilePaymentCommand, ReconcilePaymentHandler, ReconcileTrigger,
    Requester,
};
pub use refund_payment::{RefundPaymentCommand, RefundPaymentHandler, RefundPaymentResult};
