//! HTTP adapter for payments, subscriptions and movie access.
//!
//! - `POST /api/payment/initiate` - Start a movie purchase
//! - `POST /api/subscription/initiate` - Start a subscription purchase
//! - `POST|GET /api/payment/callback` - Gateway notification
//! - `GET /api/payment/status` - Poll a pending movie purchase
//! - `GET /api/payment/verify` - Verify on return from checkout
//! - `GET /api/user/payments` - Payment history
//! - `GET /api/movies/:id/access` - One movie's lock view
//! - `GET /api/user/movie-states` - Lock flags for the whole catalog
//! - `POST /api/admin/payments/refund` - Refund a completed purchase
//! - `GET /api/admin/payments/stats` - Ledger statistics

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{PaymentApiError, PaymentAppState};
pub use routes::{app_router, payment_routes};
