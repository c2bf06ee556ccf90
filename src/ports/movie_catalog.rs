//! Read-only catalog port: movie fees and subscription offers.

use async_trait::async_trait;

use crate::domain::catalog::{Movie, PlanOffer};
use crate::domain::entitlement::SubscriptionPlan;
use crate::domain::foundation::{DomainError, MovieId};

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    async fn find_movie(&self, movie_id: &MovieId) -> Result<Option<Movie>, DomainError>;

    /// Every movie in the catalog, used for bulk lock states.
    async fn list_movies(&self) -> Result<Vec<Movie>, DomainError>;

    async fn find_plan(&self, plan: SubscriptionPlan) -> Result<Option<PlanOffer>, DomainError>;
}
