//! Session validation port.
//!
//! Turns a bearer token into an `AuthenticatedUser`. The HTTP middleware is
//! the only caller; purchase handlers receive an `AuthContext` built from
//! the result and never see tokens.
//!
//! # Contract
//!
//! Implementations must:
//! - Validate the token signature
//! - Validate issuer, audience, and expiry claims
//! - Return `AuthError::InvalidToken` for malformed/bad signature tokens
//! - Return `AuthError::TokenExpired` for expired tokens
//! - Return `AuthError::ServiceUnavailable` for transient errors

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
