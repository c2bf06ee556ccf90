//! Subscription record held on a user's entitlement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, Timestamp, ValidationError};

use super::SubscriptionPlan;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Never paid, or deactivated by an operator.
    Inactive,

    /// Paid and within its period.
    Active,

    /// Period elapsed without renewal.
    Expired,

    /// Ended early, e.g. refunded by an admin.
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Inactive, Active)
                | (Active, Active) // Renewal
                | (Active, Expired)
                | (Active, Cancelled)
                | (Expired, Active)
                | (Cancelled, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Inactive => vec![Active],
            Active => vec![Active, Expired, Cancelled],
            Expired => vec![Active],
            Cancelled => vec![Active],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(SubscriptionStatus::Inactive),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// A user's subscription. Always written whole, never field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub auto_renew: bool,
}

impl Subscription {
    /// A freshly paid subscription running `duration_days` from `start`.
    pub fn activated(plan: SubscriptionPlan, start: Timestamp, duration_days: u32) -> Self {
        Self {
            plan,
            status: SubscriptionStatus::Active,
            start_date: start,
            end_date: start.add_days(i64::from(duration_days)),
            auto_renew: false,
        }
    }

    /// Active and not yet past its end date.
    pub fn is_current(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && now.is_before(&self.end_date)
    }

    /// Stored status, except that an active record past its end date reads
    /// as expired.
    pub fn effective_status(&self, now: Timestamp) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active if !now.is_before(&self.end_date) => {
                SubscriptionStatus::Expired
            }
            status => status,
        }
    }

    /// Whether this subscription unlocks every paid movie right now.
    pub fn grants_catalog_access(&self, now: Timestamp) -> bool {
        self.is_current(now) && self.plan.unlocks_paid_catalog()
    }

    /// Returns a copy with status `cancelled`.
    pub fn cancelled(&self) -> Self {
        Self {
            status: SubscriptionStatus::Cancelled,
            auto_renew: false,
            ..self.clone()
        }
    }
}
