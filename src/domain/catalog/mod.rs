//! Catalog domain module.
//!
//! Read-only views of movies and subscription offers consumed by the
//! purchase flow. Catalog management itself happens elsewhere.

mod movie;
mod plan_offer;

pub use movie::Movie;
pub use plan_offer::PlanOffer;
