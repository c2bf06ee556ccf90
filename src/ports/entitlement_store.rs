//! Entitlement store port.
//!
//! One record per user. As with the ledger, every mutation is a single
//! atomic update keyed by `user_id`; grants are set inserts so replays are
//! harmless.

use async_trait::async_trait;

use crate::domain::catalog::Movie;
use crate::domain::entitlement::{Entitlement, Subscription, SubscriptionPlan};
use crate::domain::foundation::{DomainError, MovieId, Timestamp, UserId};

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Current entitlement; an empty one for users never seen before.
    async fn find(&self, user_id: &UserId) -> Result<Entitlement, DomainError>;

    /// Add a movie to the unlocked set. Returns false if already present.
    async fn grant_movie(&self, user_id: &UserId, movie_id: &MovieId) -> Result<bool, DomainError>;

    /// Remove a movie from the unlocked set. Returns false if absent.
    async fn revoke_movie(&self, user_id: &UserId, movie_id: &MovieId)
        -> Result<bool, DomainError>;

    /// Replace the subscription record wholesale, unless the stored one
    /// started at the same instant or later. The comparison happens in the
    /// same atomic write. Returns whether the record was written.
    async fn set_subscription(
        &self,
        user_id: &UserId,
        subscription: &Subscription,
    ) -> Result<bool, DomainError>;

    /// Cancel the subscription if it is still on `plan`. Returns false otherwise.
    async fn cancel_subscription(
        &self,
        user_id: &UserId,
        plan: SubscriptionPlan,
    ) -> Result<bool, DomainError>;

    /// Whether the user may watch `movie` right now.
    async fn is_unlocked(&self, user_id: &UserId, movie: &Movie) -> Result<bool, DomainError> {
        if movie.is_free() {
            return Ok(true);
        }
        let entitlement = self.find(user_id).await?;
        Ok(entitlement.is_unlocked(movie, Timestamp::now()))
    }
}
