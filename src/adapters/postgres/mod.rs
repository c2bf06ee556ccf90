//! PostgreSQL adapters for the ledger, entitlement and catalog ports.
//!
//! Schema lives in `migrations/`; run it with `sqlx::migrate!` at startup.

mod entitlement_store;
mod movie_catalog;
mod transaction_ledger;

pub use entitlement_store::PostgresEntitlementStore;
pub use movie_catalog::PostgresMovieCatalog;
pub use transaction_ledger::PostgresTransactionLedger;
