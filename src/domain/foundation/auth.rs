//! Authentication types for the domain layer.
//!
//! `AuthenticatedUser` is what the HTTP edge extracts from a validated token.
//! `AuthContext` is the slimmer value handed to every purchase and refund
//! entry point, so no handler ever reaches for ambient request state.
//!
//! Neither type depends on a particular identity provider; the
//! `SessionValidator` port is responsible for populating them.

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Token subject.
    pub id: UserId,

    /// Sent to Chapa as the payer email.
    pub email: String,

    /// Split into payer first/last name at checkout.
    pub display_name: Option<String>,

    /// Whether the user holds the back-office admin role.
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: Option<String>,
        is_admin: bool,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
            is_admin,
        }
    }

    /// Returns the user's display name, or email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }

    /// Returns the per-request authorization context for this user.
    pub fn context(&self) -> AuthContext {
        AuthContext {
            user_id: self.id.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Explicit caller identity passed into every purchase-flow operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl AuthContext {
    /// Context for a regular signed-in user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// Context for a back-office administrator.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// True when the caller may act on a resource owned by `owner`.
    pub fn can_act_for(&self, owner: &UserId) -> bool {
        self.is_admin || &self.user_id == owner
    }
}

/// Failures from the `SessionValidator` port.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Bad signature, issuer, audience or shape.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// Maps to 503, not 401.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// The client should sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn context_carries_admin_flag() {
        let admin = AuthenticatedUser::new(user("a-1"), "a@example.com", None, true);
        let ctx = admin.context();
        assert!(ctx.is_admin);
        assert_eq!(ctx.user_id, user("a-1"));
    }

    #[test]
    fn owner_can_act_for_self_only() {
        let ctx = AuthContext::user(user("u-1"));
        assert!(ctx.can_act_for(&user("u-1")));
        assert!(!ctx.can_act_for(&user("u-2")));
    }

    #[test]
    fn admin_can_act_for_anyone() {
        let ctx = AuthContext::admin(user("root"));
        assert!(ctx.can_act_for(&user("u-2")));
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let u = AuthenticatedUser::new(user("u-1"), "viewer@example.com", None, false);
        assert_eq!(u.display_name_or_email(), "viewer@example.com");
    }

    #[test]
    fn expired_token_requires_reauthentication() {
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::service_unavailable("down").requires_reauthentication());
    }
}
