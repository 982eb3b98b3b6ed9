//! Scrobble Account Configuration
//!
//! Read-only view of the per-user configuration surface: which local users
//! have linked a scrobble-service account, their session credential and
//! their sync toggles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Opaque session key bound to one remote account.
///
/// Never printed: `Debug` and `Display` both redact the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key for request signing
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Per-user sync toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOptions {
    /// Import the remote loved tracks as local favorites
    pub sync_favorites: bool,
}

impl Default for AccountOptions {
    fn default() -> Self {
        Self {
            sync_favorites: true,
        }
    }
}

/// A local user linked to a scrobble-service account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrobbleAccount {
    /// Local user identifier
    pub user_id: String,
    /// Local display name, used in logs
    pub display_name: String,
    /// Account name on the scrobble service
    pub remote_username: String,
    pub session_key: Option<SessionKey>,
    pub options: AccountOptions,
}

impl ScrobbleAccount {
    /// The session key, if one is present and not blank
    pub fn credential(&self) -> Option<&SessionKey> {
        self.session_key.as_ref().filter(|key| !key.is_blank())
    }

    /// Whether a favorites sync pass should process this account
    pub fn is_sync_eligible(&self) -> bool {
        self.options.sync_favorites && self.credential().is_some()
    }
}

/// Source of linked scrobble accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// List every local user that has a scrobble configuration
    async fn list_accounts(&self) -> Result<Vec<ScrobbleAccount>>;
}
