//! Per-user Item Data
//!
//! Favorite flags live in the host's user-data store, keyed by (user, item).

use async_trait::async_trait;

use crate::error::Result;

/// Read/write access to per-user favorite flags
#[async_trait]
pub trait UserDataStore: Send + Sync {
    /// Whether the item is currently a favorite for the user
    async fn is_favorite(&self, user_id: &str, item_id: &str) -> Result<bool>;

    /// Set the favorite flag. Writing the current value is a no-op.
    async fn set_favorite(&self, user_id: &str, item_id: &str, favorite: bool) -> Result<()>;
}
