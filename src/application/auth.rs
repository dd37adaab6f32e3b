use std::collections::HashMap;

use thiserror::Error;

use crate::domain::UserId;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized")]
    MissingToken,

    #[error("The user cannot access the api")]
    UnknownToken,
}

/// Resolves a caller's credential to the acting user.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Fixed token table. Stands in for a real identity provider.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two demo users: `token_user_1` and `token_user_2`.
    pub fn stub() -> Self {
        Self::new()
            .with_token("token_user_1", 1)
            .with_token("token_user_2", 2)
    }

    pub fn with_token(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

impl Authenticator for StaticTokenAuthenticator {
    /// Accepts either a raw token or an `Authorization` header value.
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .get(token)
            .copied()
            .ok_or(AuthError::UnknownToken)
    }
}
