//! HTTP adapters - axum routers, DTOs and middleware.

pub mod middleware;
pub mod payment;

pub use middleware::{auth_middleware, AuthState, RequireAuth};
pub use payment::{app_router, payment_routes, PaymentApiError, PaymentAppState};
