//! Catalog lock map as the UI renders it.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::MovieId;
use crate::domain::purchase::ReportedStatus;

/// Per-movie locked flag. Movies never seen are locked.
#[derive(Debug, Default)]
pub struct LockStates {
    locked: RwLock<HashMap<MovieId, bool>>,
}

impl LockStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the map from the server's `movie-states` answer.
    pub fn from_server(states: impl IntoIterator<Item = (MovieId, bool)>) -> Self {
        Self {
            locked: RwLock::new(states.into_iter().collect()),
        }
    }

    pub fn is_locked(&self, movie_id: &MovieId) -> bool {
        self.locked
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(movie_id)
            .copied()
            .unwrap_or(true)
    }

    /// Blur always mirrors the lock.
    pub fn is_blurred(&self, movie_id: &MovieId) -> bool {
        self.is_locked(movie_id)
    }

    /// Applies a poll result. Returns true if the movie was unlocked by it.
    ///
    /// Only `success` changes anything; `failed`, `pending` and `refunded`
    /// leave the current flag alone.
    pub fn apply(&self, movie_id: MovieId, status: ReportedStatus) -> bool {
        if status != ReportedStatus::Success {
            return false;
        }
        let mut locked = self.locked.write().unwrap_or_else(|e| e.into_inner());
        locked.insert(movie_id, false).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_movies_are_locked_and_blurred() {
        let states = LockStates::new();
        let movie = MovieId::new();
        assert!(states.is_locked(&movie));
        assert!(states.is_blurred(&movie));
    }

    #[test]
    fn only_success_unlocks() {
        let states = LockStates::new();
        let movie = MovieId::new();

        for status in [
            ReportedStatus::Pending,
            ReportedStatus::Failed,
            ReportedStatus::Refunded,
        ] {
            assert!(!states.apply(movie, status));
            assert!(states.is_locked(&movie));
        }

        assert!(states.apply(movie, ReportedStatus::Success));
        assert!(!states.is_locked(&movie));
    }

    #[test]
    fn failed_does_not_relock_an_unlocked_movie() {
        let movie = MovieId::new();
        let states = LockStates::from_server([(movie, false)]);
        states.apply(movie, ReportedStatus::Failed);
        assert!(!states.is_locked(&movie));
    }

    #[test]
    fn second_success_reports_no_change() {
        let states = LockStates::new();
        let movie = MovieId::new();
        assert!(states.apply(movie, ReportedStatus::Success));
        assert!(!states.apply(movie, ReportedStatus::Success));
    }
}
