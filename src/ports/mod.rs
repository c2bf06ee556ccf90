//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `TransactionLedger` - Append-only purchase ledger keyed by `tx_ref`
//! - `EntitlementStore` - Per-user unlocked movies and subscription
//! - `MovieCatalog` - Movie fees and subscription offers (read-only)
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Hosted checkout and verification
//! - `SessionValidator` - Bearer token validation

mod entitlement_store;
mod movie_catalog;
mod payment_gateway;
mod session_validator;
mod transaction_ledger;

pub use entitlement_store::EntitlementStore;
pub use movie_catalog::MovieCatalog;
pub use payment_gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode, Payer, PaymentGateway,
};
pub use session_validator::SessionValidator;
pub use transaction_ledger::TransactionLedger;
