//! Identity provider seam.

use async_trait::async_trait;

/// Result of validating a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenValidation {
    pub valid: bool,
    /// Authenticated user id; set only when `valid` is true.
    pub subject: Option<String>,
}

impl TokenValidation {
    pub fn valid(subject: impl Into<String>) -> Self {
        Self {
            valid: true,
            subject: Some(subject.into()),
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    /// Subject of a valid token.
    pub fn into_subject(self) -> Option<String> {
        if self.valid { self.subject } else { None }
    }
}

/// Opaque token validation, provided by an external identity service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn validate_token(&self, token: &str) -> TokenValidation;
}
