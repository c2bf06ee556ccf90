//! Client side of the purchase flow: resume a pending purchase after the
//! gateway redirect, poll the status endpoint with backoff, and keep the
//! catalog lock map in step.
//!
//! - `PendingPurchaseStore` - where the in-flight `{movieId, tx_ref, startedAt}` lives
//! - `PaymentStatusClient` - calls `GET /api/payment/status`
//! - `PaymentPoller` - bounded retries, one-hour expiry
//! - `LockStates` - the UI lock map; only `success` unlocks

mod error;
mod lock_state;
mod pending_store;
mod poller;
mod status_client;

pub use error::ClientError;
pub use lock_state::LockStates;
pub use pending_store::{
    FilePendingStore, InMemoryPendingStore, PendingPurchase, PendingPurchaseStore,
};
pub use poller::{BackoffPolicy, PaymentPoller, PollOutcome, PENDING_EXPIRY};
pub use status_client::{HttpPaymentStatusClient, PaymentStatusClient};
