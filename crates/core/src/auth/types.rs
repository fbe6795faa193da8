use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bearer credential returned by an identity provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    /// Expiry hint from the provider, if it gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Time left before the hinted expiry, `None` without a hint.
    /// An already-expired hint yields zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|exp| (exp - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Access level of the signed-in user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// May modify only the records they own.
    #[default]
    User,
    /// May modify any record.
    Admin,
}

impl Permission {
    pub fn is_admin(self) -> bool {
        self == Permission::Admin
    }
}

/// Whether `user_id` names a real signed-in user.
///
/// Empty ids and the "0" placeholder both count as signed out.
pub fn is_real_user_id(user_id: Option<&str>) -> bool {
    match user_id.map(str::trim) {
        None | Some("") | Some("0") => false,
        Some(_) => true,
    }
}
