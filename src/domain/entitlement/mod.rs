//! Entitlement domain module.
//!
//! Tracks which movies each user has unlocked and their subscription, and
//! derives the per-movie lock view from that.
//!
//! # Module Structure
//!
//! - `aggregate` - Entitlement aggregate
//! - `plan` - SubscriptionPlan and the blanket-unlock policy
//! - `subscription` - Subscription record and status state machine
//! - `access` - AccessType and MovieAccess lock view

mod access;
mod aggregate;
mod plan;
mod subscription;

pub use access::{AccessType, MovieAccess};
pub use aggregate::Entitlement;
pub use plan::SubscriptionPlan;
pub use subscription::{Subscription, SubscriptionStatus};
