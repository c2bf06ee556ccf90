//! Movie access queries: one movie's lock view, or the whole catalog's.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::entitlement::MovieAccess;
use crate::domain::foundation::{MovieId, Timestamp, UserId};
use crate::domain::purchase::PurchaseError;
use crate::ports::{EntitlementStore, MovieCatalog};

#[derive(Debug, Clone)]
pub struct GetMovieAccessQuery {
    pub user_id: UserId,
    pub movie_id: MovieId,
}

#[derive(Debug, Clone)]
pub struct GetMovieStatesQuery {
    pub user_id: UserId,
}

/// Lock flags for the catalog grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieLockState {
    pub is_locked: bool,
    pub is_blurred: bool,
}

impl From<&MovieAccess> for MovieLockState {
    fn from(access: &MovieAccess) -> Self {
        Self {
            is_locked: access.is_locked,
            is_blurred: access.is_blurred,
        }
    }
}

/// Read-only handler over catalog and entitlements.
pub struct MovieAccessHandler {
    entitlements: Arc<dyn EntitlementStore>,
    catalog: Arc<dyn MovieCatalog>,
}

impl MovieAccessHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>, catalog: Arc<dyn MovieCatalog>) -> Self {
        Self {
            entitlements,
            catalog,
        }
    }

    pub async fn movie_access(
        &self,
        query: GetMovieAccessQuery,
    ) -> Result<MovieAccess, PurchaseError> {
        let movie = self
            .catalog
            .find_movie(&query.movie_id)
            .await?
            .ok_or_else(|| PurchaseError::movie_not_found(&query.movie_id))?;
        let entitlement = self.entitlements.find(&query.user_id).await?;
        Ok(MovieAccess::evaluate(&entitlement, &movie, Timestamp::now()))
    }

    pub async fn movie_states(
        &self,
        query: GetMovieStatesQuery,
    ) -> Result<BTreeMap<MovieId, MovieLockState>, PurchaseError> {
        let movies = self.catalog.list_movies().await?;
        let entitlement = self.entitlements.find(&query.user_id).await?;
        let now = Timestamp::now();
        Ok(movies
            .iter()
            .map(|movie| {
                let access = MovieAccess::evaluate(&entitlement, movie, now);
                (movie.id, MovieLockState::from(&access))
            })
            .collect())
    }
}
