//! Entitlement aggregate - what a single user may watch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::catalog::Movie;
use crate::domain::foundation::{MovieId, Timestamp, UserId};

use super::{AccessType, Subscription, SubscriptionPlan, SubscriptionStatus};

/// Per-user record of unlocked movies and subscription state.
///
/// Mutations report whether anything changed so storage adapters can skip
/// no-op writes and handlers can log duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub unlocked_movies: BTreeSet<MovieId>,
    pub subscription: Option<Subscription>,
    pub updated_at: Timestamp,
}

impl Entitlement {
    /// An entitlement with nothing unlocked.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            unlocked_movies: BTreeSet::new(),
            subscription: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Adds a movie. Returns false if it was already unlocked.
    pub fn grant_movie(&mut self, movie_id: MovieId) -> bool {
        let added = self.unlocked_movies.insert(movie_id);
        if added {
            self.updated_at = Timestamp::now();
        }
        added
    }

    /// Removes a movie. Returns false if it was not unlocked.
    pub fn revoke_movie(&mut self, movie_id: &MovieId) -> bool {
        let removed = self.unlocked_movies.remove(movie_id);
        if removed {
            self.updated_at = Timestamp::now();
        }
        removed
    }

    /// Replaces the subscription record wholesale.
    pub fn set_subscription(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
        self.updated_at = Timestamp::now();
    }

    /// Stores `subscription` unless the current one started at the same
    /// instant or later. Returns whether it was stored.
    pub fn apply_subscription(&mut self, subscription: Subscription) -> bool {
        if let Some(current) = &self.subscription {
            if !current.start_date.is_before(&subscription.start_date) {
                return false;
            }
        }
        self.set_subscription(subscription);
        true
    }

    /// Cancels the subscription, but only while it is still on `plan`.
    ///
    /// A newer subscription on a different plan is left untouched.
    pub fn cancel_subscription(&mut self, plan: SubscriptionPlan) -> bool {
        match &self.subscription {
            Some(sub) if sub.plan == plan && sub.status != SubscriptionStatus::Cancelled => {
                self.subscription = Some(sub.cancelled());
                self.updated_at = Timestamp::now();
                true
            }
            _ => false,
        }
    }

    pub fn has_purchased(&self, movie_id: &MovieId) -> bool {
        self.unlocked_movies.contains(movie_id)
    }

    /// True when a current subscription unlocks the whole paid catalog.
    pub fn has_catalog_subscription(&self, now: Timestamp) -> bool {
        self.subscription
            .as_ref()
            .map(|s| s.grants_catalog_access(now))
            .unwrap_or(false)
    }

    /// How this user gets at `movie`, in precedence order.
    pub fn access_to(&self, movie: &Movie, now: Timestamp) -> AccessType {
        if movie.is_free() {
            AccessType::Free
        } else if self.has_purchased(&movie.id) {
            AccessType::Purchased
        } else if self.has_catalog_subscription(now) {
            AccessType::Subscription
        } else {
            AccessType::Locked
        }
    }

    pub fn is_unlocked(&self, movie: &Movie, now: Timestamp) -> bool {
        self.access_to(movie, now) != AccessType::Locked
    }
}
