//! The caller's current subscription, as the account page shows it.

use std::sync::Arc;

use crate::domain::entitlement::{Subscription, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::purchase::PurchaseError;
use crate::ports::EntitlementStore;

#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

/// Stored subscription plus what it means right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOverview {
    pub subscription: Option<Subscription>,
    /// `inactive` when the user never subscribed.
    pub status: SubscriptionStatus,
    pub unlocks_paid_movies: bool,
}

pub struct GetSubscriptionHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl GetSubscriptionHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<SubscriptionOverview, PurchaseError> {
        let entitlement = self.entitlements.find(&query.user_id).await?;
        let now = Timestamp::now();
        let subscription = entitlement.subscription;
        Ok(SubscriptionOverview {
            status: subscription
                .as_ref()
                .map(|s| s.effective_status(now))
                .unwrap_or(SubscriptionStatus::Inactive),
            unlocks_paid_movies: subscription
                .as_ref()
                .map(|s| s.grants_catalog_access(now))
                .unwrap_or(false),
            subscription,
        })
    }
}
