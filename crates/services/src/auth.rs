use std::fmt;
use std::sync::Arc;

use storage::repository::{AUTH_TOKEN_KEY, DeviceStore};

use crate::error::AuthError;

/// Bearer token for the backend. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// # Errors
    ///
    /// Returns `AuthError::EmptyToken` for blank input.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, AuthError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Reads and writes the auth token kept in the device store.
#[derive(Clone)]
pub struct AuthService {
    device: Arc<dyn DeviceStore>,
}

impl AuthService {
    #[must_use]
    pub fn new(device: Arc<dyn DeviceStore>) -> Self {
        Self { device }
    }

    /// The stored token, if any. A blank stored value counts as missing.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the device store cannot be read.
    pub async fn token(&self) -> Result<Option<AuthToken>, AuthError> {
        let stored = self.device.get_item(AUTH_TOKEN_KEY).await?;
        Ok(stored.and_then(|raw| AuthToken::parse(raw).ok()))
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` when the player is not logged in.
    pub async fn require_token(&self) -> Result<AuthToken, AuthError> {
        self.token().await?.ok_or(AuthError::MissingToken)
    }

    /// # Errors
    ///
    /// Returns `AuthError::EmptyToken` for blank input, or `AuthError::Storage`.
    pub async fn store_token(&self, raw: &str) -> Result<AuthToken, AuthError> {
        let token = AuthToken::parse(raw)?;
        self.device.set_item(AUTH_TOKEN_KEY, token.as_str()).await?;
        tracing::info!("auth token stored");
        Ok(token)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the device store cannot be written.
    pub async fn clear_token(&self) -> Result<(), AuthError> {
        self.device.remove_item(AUTH_TOKEN_KEY).await?;
        tracing::info!("auth token cleared");
        Ok(())
    }
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}
