//! Cinegate - payment reconciliation and movie entitlements.
//!
//! Turns gateway checkouts into durable unlock state for a streaming
//! catalog, tolerating duplicated callbacks, polling races and flaky
//! gateway responses.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
