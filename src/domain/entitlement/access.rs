//! Derived per-movie lock view. Computed on request, never stored.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::Movie;
use crate::domain::foundation::{MovieId, Timestamp};

use super::Entitlement;

/// Why a user can (or cannot) watch a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Free,
    Purchased,
    Subscription,
    Locked,
}

/// Lock state for one movie as the player UI consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieAccess {
    pub movie_id: MovieId,
    pub is_locked: bool,
    pub is_blurred: bool,
    pub access_type: AccessType,
}

impl MovieAccess {
    pub fn evaluate(entitlement: &Entitlement, movie: &Movie, now: Timestamp) -> Self {
        let access_type = entitlement.access_to(movie, now);
        let is_locked = access_type == AccessType::Locked;
        Self {
            movie_id: movie.id,
            is_locked,
            // Blur always mirrors the lock.
            is_blurred: is_locked,
            access_type,
        }
    }
}
