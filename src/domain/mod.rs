//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `purchase` - Transaction ledger vocabulary and purchase errors
//! - `entitlement` - Unlocked movies, subscriptions, and lock views
//! - `catalog` - Movies and subscription offers as the paywall sees them

pub mod catalog;
pub mod entitlement;
pub mod foundation;
pub mod purchase;
