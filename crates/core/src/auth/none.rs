use async_trait::async_trait;

use super::{AuthError, Credential, IdentityProvider};

/// Identity provider for a signed-out session.
/// Requests go out without a bearer token.
pub struct SignedOutIdentity;

impl SignedOutIdentity {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SignedOutIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for SignedOutIdentity {
    async fn credential(&self, _force_refresh: bool) -> Result<Credential, AuthError> {
        Err(AuthError::NotSignedIn)
    }

    fn user_id(&self) -> Option<String> {
        None
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_out_has_no_credential() {
        let identity = SignedOutIdentity::new();
        let result = identity.credential(true).await;
        assert!(matches!(result, Err(AuthError::NotSignedIn)));
        assert!(identity.user_id().is_none());
    }

    #[test]
    fn test_signed_out_method_name() {
        assert_eq!(SignedOutIdentity::default().method_name(), "none");
    }
}
