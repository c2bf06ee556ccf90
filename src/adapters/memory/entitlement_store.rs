//! In-memory entitlement store keyed by user.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::entitlement::{Entitlement, Subscription, SubscriptionPlan};
use crate::domain::foundation::{DomainError, ErrorCode, MovieId, UserId};
use crate::ports::EntitlementStore;

#[derive(Default)]
pub struct InMemoryEntitlementStore {
    records: Mutex<HashMap<UserId, Entitlement>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored record.
    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<UserId, Entitlement>>, DomainError> {
        self.records.lock().map_err(|_| {
            DomainError::new(ErrorCode::InternalError, "entitlement lock poisoned")
        })
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn find(&self, user_id: &UserId) -> Result<Entitlement, DomainError> {
        Ok(self
            .records()?
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| Entitlement::empty(user_id.clone())))
    }

    async fn grant_movie(&self, user_id: &UserId, movie_id: &MovieId) -> Result<bool, DomainError> {
        let mut records = self.records()?;
        let record = records
            .entry(user_id.clone())
            .or_insert_with(|| Entitlement::empty(user_id.clone()));
        Ok(record.grant_movie(*movie_id))
    }

    async fn revoke_movie(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
    ) -> Result<bool, DomainError> {
        let mut records = self.records()?;
        Ok(records
            .get_mut(user_id)
            .map(|record| record.revoke_movie(movie_id))
            .unwrap_or(false))
    }

    async fn set_subscription(
        &self,
        user_id: &UserId,
        subscription: &Subscription,
    ) -> Result<bool, DomainError> {
        let mut records = self.records()?;
        Ok(records
            .entry(user_id.clone())
            .or_insert_with(|| Entitlement::empty(user_id.clone()))
            .apply_subscription(subscription.clone()))
    }

    async fn cancel_subscription(
        &self,
        user_id: &UserId,
        plan: SubscriptionPlan,
    ) -> Result<bool, DomainError> {
        let mut records = self.records()?;
        Ok(records
            .get_mut(user_id)
            .map(|record| record.cancel_subscription(plan))
            .unwrap_or(false))
    }
}
