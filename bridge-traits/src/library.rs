//! Library Catalog Abstraction
//!
//! The host owns the catalog; the core only lists artists and their songs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Provider-id key holding the cross-service artist identity
pub const ARTIST_IDENTITY_PROVIDER: &str = "MusicBrainzArtist";

/// An artist in the user's local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArtist {
    pub id: String,
    pub name: String,
    /// External provider ids (e.g. `MusicBrainzArtist -> <mbid>`)
    #[serde(default)]
    pub provider_ids: HashMap<String, String>,
}

impl LocalArtist {
    /// The cross-service identity, if the artist carries a non-empty one
    pub fn artist_identity(&self) -> Option<&str> {
        self.provider_ids
            .get(ARTIST_IDENTITY_PROVIDER)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }
}

/// A song in the user's local library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSong {
    pub id: String,
    pub name: String,
    pub artist_identity: Option<String>,
}

/// Read access to the host's library catalog
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// List the artists visible to a user
    async fn list_artists(&self, user_id: &str) -> Result<Vec<LocalArtist>>;

    /// List the audio items tagged with an artist, as visible to a user
    async fn list_songs(&self, artist_id: &str, user_id: &str) -> Result<Vec<LocalSong>>;
}
