//! Mock identity provider with scripted credentials.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::auth::{AuthError, Credential, IdentityProvider, Permission};

enum Scripted {
    Ready(Result<Credential, AuthError>),
    Delayed(Duration, Credential),
}

/// Mock implementation of the IdentityProvider trait.
///
/// Scripted credentials are handed out first; after that every call mints
/// a fresh `token-N`. A signed-out mock always answers `NotSignedIn`.
pub struct MockIdentityProvider {
    user_id: Option<String>,
    permission: Permission,
    scripted: Arc<RwLock<VecDeque<Scripted>>>,
    calls: Arc<RwLock<Vec<bool>>>,
    call_count: AtomicUsize,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    /// Signed in as `user-1`.
    pub fn new() -> Self {
        Self::with_user("user-1")
    }

    pub fn with_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            permission: Permission::User,
            scripted: Arc::new(RwLock::new(VecDeque::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user_id: None,
            ..Self::new()
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub async fn push_token(&self, token: &str) {
        self.push_credential(Credential::new(token)).await;
    }

    pub async fn push_credential(&self, credential: Credential) {
        self.scripted
            .write()
            .await
            .push_back(Scripted::Ready(Ok(credential)));
    }

    /// Queue a token that is only handed out after `delay`.
    pub async fn push_delayed_token(&self, delay: Duration, token: &str) {
        self.scripted
            .write()
            .await
            .push_back(Scripted::Delayed(delay, Credential::new(token)));
    }

    pub async fn push_error(&self, error: AuthError) {
        self.scripted
            .write()
            .await
            .push_back(Scripted::Ready(Err(error)));
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The `force_refresh` flag of every call, in order.
    pub async fn calls(&self) -> Vec<bool> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn credential(&self, force_refresh: bool) -> Result<Credential, AuthError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.write().await.push(force_refresh);

        if self.user_id.is_none() {
            return Err(AuthError::NotSignedIn);
        }

        let next = self.scripted.write().await.pop_front();
        match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Delayed(delay, credential)) => {
                tokio::time::sleep(delay).await;
                Ok(credential)
            }
            None => Ok(Credential::new(format!("token-{}", n))),
        }
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn method_name(&self) -> &'static str {
        "mock"
    }
}
