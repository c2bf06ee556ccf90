//! In-memory catalog, seeded through builder methods.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::catalog::{Movie, PlanOffer};
use crate::domain::entitlement::SubscriptionPlan;
use crate::domain::foundation::{DomainError, MovieId};
use crate::ports::MovieCatalog;

/// Fixed catalog. Contents are set at construction and never change.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMovieCatalog {
    movies: HashMap<MovieId, Movie>,
    plans: HashMap<SubscriptionPlan, PlanOffer>,
}

impl InMemoryMovieCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(mut self, movie: Movie) -> Self {
        self.movies.insert(movie.id, movie);
        self
    }

    pub fn with_plan(mut self, offer: PlanOffer) -> Self {
        self.plans.insert(offer.plan, offer);
        self
    }
}

#[async_trait]
impl MovieCatalog for InMemoryMovieCatalog {
    async fn find_movie(&self, movie_id: &MovieId) -> Result<Option<Movie>, DomainError> {
        Ok(self.movies.get(movie_id).cloned())
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, DomainError> {
        let mut movies: Vec<Movie> = self.movies.values().cloned().collect();
        movies.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(movies)
    }

    async fn find_plan(&self, plan: SubscriptionPlan) -> Result<Option<PlanOffer>, DomainError> {
        Ok(self.plans.get(&plan).cloned())
    }
}
