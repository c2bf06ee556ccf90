//! Purchasable subscription offers.

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::SubscriptionPlan;
use crate::domain::foundation::Money;

/// Price and duration of a subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOffer {
    pub plan: SubscriptionPlan,
    pub price: Money,
    pub duration_days: u32,
    pub is_active: bool,
}

impl PlanOffer {
    pub fn new(plan: SubscriptionPlan, price: Money, duration_days: u32) -> Self {
        Self {
            plan,
            price,
            duration_days,
            is_active: true,
        }
    }

    /// Only active offers with a positive price and duration go to checkout.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && !self.price.is_free() && self.duration_days > 0
    }
}
