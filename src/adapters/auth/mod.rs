//! Authentication adapters implementing the `SessionValidator` port:
//!
//! - `jwt` - HS256 session tokens from the identity provider
//! - `mock` - fixed token table for tests

mod jwt;
mod mock;

pub use jwt::{Audience, JwtConfig, JwtSessionValidator, SessionClaims};
pub use mock::MockSessionValidator;
