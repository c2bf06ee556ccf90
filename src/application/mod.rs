//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers (initiate, reconcile, refund) write; query handlers read.

pub mod handlers;

pub use handlers::*;
