//! Mock session validator for tests.
//!
//! # Example
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_test_user("viewer-token", "viewer-1")
//!     .with_test_admin("admin-token", "ops");
//!
//! let user = validator.validate("viewer-token").await?;
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, ValidationError};
use crate::ports::SessionValidator;

/// Maps fixed tokens to users. Unknown tokens return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation while set.
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> RwLockWriteGuard<'_, HashMap<String, AuthenticatedUser>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }

    fn tokens_read(&self) -> RwLockReadGuard<'_, HashMap<String, AuthenticatedUser>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a regular viewer with a derived email and name.
    pub fn with_test_user(
        self,
        token: impl Into<String>,
        user_id: &str,
    ) -> Result<Self, ValidationError> {
        let user = test_user(user_id, false)?;
        Ok(self.with_user(token, user))
    }

    /// Adds an admin with a derived email and name.
    pub fn with_test_admin(
        self,
        token: impl Into<String>,
        user_id: &str,
    ) -> Result<Self, ValidationError> {
        let user = test_user(user_id, true)?;
        Ok(self.with_user(token, user))
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(|e| e.into_inner()) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *self.force_error.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens().insert(token.into(), user);
    }

    pub fn remove_token(&self, token: &str) {
        self.tokens().remove(token);
    }

    pub fn token_count(&self) -> usize {
        self.tokens_read().len()
    }
}

fn test_user(user_id: &str, is_admin: bool) -> Result<AuthenticatedUser, ValidationError> {
    Ok(AuthenticatedUser::new(
        UserId::new(user_id)?,
        format!("{}@test.example.com", user_id),
        Some(format!("Test User {}", user_id)),
        is_admin,
    ))
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }

        self.tokens_read()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
