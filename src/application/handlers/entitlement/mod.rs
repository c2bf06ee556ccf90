//! Entitlement read handlers.

mod movie_access;
mod subscription_status;

pub use movie_access::{
    GetMovieAccessQuery, GetMovieStatesQuery, MovieAccessHandler, MovieLockState,
};
pub use subscription_status::{
    GetSubscriptionHandler, GetSubscriptionQuery, SubscriptionOverview,
};
