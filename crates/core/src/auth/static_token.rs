//! Fixed bearer token identity.

use async_trait::async_trait;

use super::{AuthError, Credential, IdentityProvider, Permission};

/// Identity provider backed by a configured user id and token.
///
/// The token never expires on its own; a forced refresh returns the same
/// token, so a server-side 401 surfaces after one retry.
pub struct StaticTokenIdentity {
    user_id: String,
    token: String,
    permission: Permission,
}

impl StaticTokenIdentity {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            permission: Permission::User,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn credential(&self, _force_refresh: bool) -> Result<Credential, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::InvalidCredentials("empty token".to_string()));
        }
        Ok(Credential::new(self.token.clone()))
    }

    fn user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn method_name(&self) -> &'static str {
        "static_token"
    }
}
