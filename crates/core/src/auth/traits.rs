use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::types::{Credential, Permission};
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Identity provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("Identity provider unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::NotSignedIn | AuthError::InvalidCredentials(_) => {
                ErrorKind::Unauthenticated
            }
            AuthError::Timeout(_) | AuthError::ServiceUnavailable(_) => ErrorKind::Transient,
            AuthError::ConfigurationError(_) => ErrorKind::Permanent,
        }
    }
}

/// Source of bearer credentials for the signed-in user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Obtain a credential. `force_refresh` asks the provider to bypass any
    /// cache of its own.
    async fn credential(&self, force_refresh: bool) -> Result<Credential, AuthError>;

    /// Id of the signed-in user, if any.
    fn user_id(&self) -> Option<String>;

    /// Access level of the signed-in user.
    fn permission(&self) -> Permission {
        Permission::User
    }

    /// Name of this identity method
    fn method_name(&self) -> &'static str;
}
