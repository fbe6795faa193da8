mod none;
mod static_token;
mod token_cache;
mod traits;
mod types;

pub use none::*;
pub use static_token::*;
pub use token_cache::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::config::AuthConfig;

/// Factory function to create the identity provider from config
pub fn create_identity_provider(
    config: &AuthConfig,
) -> Result<Arc<dyn IdentityProvider>, AuthError> {
    let token = config.token.as_deref().filter(|t| !t.is_empty());
    let user_id = config
        .user_id
        .as_deref()
        .filter(|u| is_real_user_id(Some(u)));

    match (user_id, token) {
        (None, None) => Ok(Arc::new(SignedOutIdentity::new())),
        (Some(user_id), Some(token)) => Ok(Arc::new(
            StaticTokenIdentity::new(user_id, token).with_permission(config.permission),
        )),
        (Some(_), None) => Err(AuthError::ConfigurationError(
            "auth.token must be set when auth.user_id is configured".to_string(),
        )),
        (None, Some(_)) => Err(AuthError::ConfigurationError(
            "auth.user_id must be set when auth.token is configured".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user_id: Option<&str>, token: Option<&str>) -> AuthConfig {
        AuthConfig {
            user_id: user_id.map(String::from),
            token: token.map(String::from),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_create_signed_out() {
        let identity = create_identity_provider(&config(None, None)).unwrap();
        assert_eq!(identity.method_name(), "none");

        // "0" is the signed-out placeholder
        let identity = create_identity_provider(&config(Some("0"), None)).unwrap();
        assert_eq!(identity.method_name(), "none");
    }

    #[test]
    fn test_create_static_token() {
        let identity = create_identity_provider(&config(Some("5"), Some("tok"))).unwrap();
        assert_eq!(identity.method_name(), "static_token");
        assert_eq!(identity.user_id().as_deref(), Some("5"));
        assert_eq!(identity.permission(), Permission::User);

        let admin = AuthConfig {
            permission: Permission::Admin,
            ..config(Some("5"), Some("tok"))
        };
        let identity = create_identity_provider(&admin).unwrap();
        assert!(identity.permission().is_admin());
    }

    #[test]
    fn test_create_missing_half() {
        assert!(matches!(
            create_identity_provider(&config(Some("5"), None)),
            Err(AuthError::ConfigurationError(_))
        ));
        assert!(matches!(
            create_identity_provider(&config(None, Some("tok"))),
            Err(AuthError::ConfigurationError(_))
        ));
    }
}
