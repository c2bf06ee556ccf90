//! In-memory adapters for tests and local development.

mod entitlement_store;
mod movie_catalog;
mod transaction_ledger;

pub use entitlement_store::InMemoryEntitlementStore;
pub use movie_catalog::InMemoryMovieCatalog;
pub use transaction_ledger::InMemoryTransactionLedger;
