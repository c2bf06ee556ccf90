//! Purchase domain module.
//!
//! The transaction ledger's vocabulary: what was bought, by whom, under
//! which gateway reference, and how far it has progressed.
//!
//! # Module Structure
//!
//! - `transaction` - Transaction aggregate
//! - `status` - TransactionStatus state machine and reported status words
//! - `subject` - PurchaseSubject (movie or subscription plan)
//! - `tx_ref` - TxRef generation and parsing
//! - `verification` - VerificationResult from the gateway
//! - `summary` - LedgerSummary for admin statistics
//! - `errors` - PurchaseError taxonomy

mod errors;
mod status;
mod subject;
mod summary;
mod transaction;
mod tx_ref;
mod verification;

pub use errors::{MissingResource, PurchaseError};
pub use status::{ReportedStatus, TransactionStatus};
pub use subject::{PurchaseSubject, SubjectType};
pub use summary::LedgerSummary;
pub use transaction::{RefundRecord, Transaction};
pub use tx_ref::TxRef;
pub use verification::{VerificationResult, VerifiedPayment};
