//! Request and response models for the scrobble web service.
//!
//! The service's JSON is loosely typed: numbers arrive as strings, a
//! single-element list arrives as a bare object and absent identifiers are
//! sent as empty strings. The deserializers below absorb those quirks so the
//! rest of the core sees clean types.

use bridge_traits::accounts::SessionKey;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signing::RequestParameters;

/// Outcome of a call that reached the service and returned a body.
///
/// Transport failures never produce an `ApiResponse`; they surface as
/// `Err(ScrobbleError::Transport)` from the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    /// Well-formed error envelope (`{"error": code, "message": ...}`)
    ServiceError(ApiError),
    /// Body was not JSON or did not match the expected shape
    Malformed(String),
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    /// The payload, treating service errors and malformed bodies as "no data"
    pub fn into_success(self) -> Option<T> {
        match self {
            ApiResponse::Success(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn service_error(&self) -> Option<&ApiError> {
        match self {
            ApiResponse::ServiceError(err) => Some(err),
            _ => None,
        }
    }
}

/// Error descriptor from the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code, self.message)
    }
}

/// Well-known service error codes
pub mod error_codes {
    pub const INVALID_PARAMETERS: i32 = 6;
    pub const AUTHENTICATION_FAILED: i32 = 4;
    pub const INVALID_API_KEY: i32 = 10;
    pub const INVALID_SESSION_KEY: i32 = 9;
    pub const RATE_LIMIT_EXCEEDED: i32 = 29;
}

/// A call the client can sign and send.
///
/// The client adds `method`, `api_key` and (when present) `sk` before
/// signing; implementors contribute only their own parameters.
pub trait ScrobbleRequest: Send + Sync {
    /// Service method name, e.g. `user.getlovedtracks`
    fn method(&self) -> &'static str;

    fn parameters(&self) -> RequestParameters;

    fn session_key(&self) -> Option<&SessionKey> {
        None
    }

    /// Overrides the configured scheme when set
    fn secure(&self) -> Option<bool> {
        None
    }
}

/// `user.getLovedTracks` for one page
#[derive(Debug, Clone)]
pub struct GetLovedTracks {
    pub user: String,
    pub page: u32,
    pub limit: u32,
    pub session_key: Option<SessionKey>,
    pub secure: Option<bool>,
}

impl GetLovedTracks {
    pub fn new(user: impl Into<String>, page: u32, limit: u32) -> Self {
        Self {
            user: user.into(),
            page,
            limit,
            session_key: None,
            secure: None,
        }
    }

    pub fn with_session_key(mut self, key: SessionKey) -> Self {
        self.session_key = Some(key);
        self
    }
}

impl ScrobbleRequest for GetLovedTracks {
    fn method(&self) -> &'static str {
        "user.getlovedtracks"
    }

    fn parameters(&self) -> RequestParameters {
        RequestParameters::new()
            .with("user", self.user.as_str())
            .with("page", self.page.to_string())
            .with("limit", self.limit.to_string())
    }

    fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    fn secure(&self) -> Option<bool> {
        self.secure
    }
}

/// `track.love` / `track.unlove`
#[derive(Debug, Clone)]
pub struct LoveTrack {
    pub artist: String,
    pub track: String,
    pub session_key: SessionKey,
    /// `false` sends `track.unlove`
    pub love: bool,
}

impl ScrobbleRequest for LoveTrack {
    fn method(&self) -> &'static str {
        if self.love {
            "track.love"
        } else {
            "track.unlove"
        }
    }

    fn parameters(&self) -> RequestParameters {
        RequestParameters::new()
            .with("artist", self.artist.as_str())
            .with("track", self.track.as_str())
    }

    fn session_key(&self) -> Option<&SessionKey> {
        Some(&self.session_key)
    }
}

/// Empty success body (`{}`) returned by write methods
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Acknowledged {}

/// A remote favorite, flattened from the wire shape
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WireTrack")]
pub struct FavoriteTrack {
    pub name: String,
    pub artist_name: String,
    /// Cross-service artist identifier (MusicBrainz id); `None` when absent or blank
    pub artist_identity: Option<String>,
}

impl FavoriteTrack {
    pub fn new(
        name: impl Into<String>,
        artist_name: impl Into<String>,
        artist_identity: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            artist_name: artist_name.into(),
            artist_identity: non_blank(artist_identity),
        }
    }
}

#[derive(Deserialize)]
struct WireTrack {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist: WireArtist,
}

#[derive(Default, Deserialize)]
struct WireArtist {
    #[serde(default)]
    name: String,
    #[serde(default)]
    mbid: Option<String>,
}

impl From<WireTrack> for FavoriteTrack {
    fn from(wire: WireTrack) -> Self {
        Self {
            name: wire.name,
            artist_name: wire.artist.name,
            artist_identity: non_blank(wire.artist.mbid.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Paging attributes (`@attr`) of a list response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub user: String,
    #[serde(deserialize_with = "number_from_any")]
    pub page: u32,
    #[serde(rename = "totalPages", deserialize_with = "number_from_any")]
    pub total_pages: u32,
    #[serde(rename = "perPage", default, deserialize_with = "number_from_any")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "number_from_any")]
    pub total: u32,
}

impl PageMetadata {
    pub fn new(page: u32, total_pages: u32) -> Self {
        Self {
            user: String::new(),
            page,
            total_pages,
            per_page: 0,
            total: 0,
        }
    }

    pub fn is_last_page(&self) -> bool {
        self.page >= self.total_pages
    }

    /// `page / total_pages`, clamped to `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        let total = self.total_pages.max(1) as f64;
        (self.page as f64 / total).clamp(0.0, 1.0)
    }
}

/// `user.getLovedTracks` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LovedTracksResponse {
    #[serde(rename = "lovedtracks")]
    pub loved_tracks: LovedTracks,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LovedTracks {
    #[serde(rename = "track", default, deserialize_with = "one_or_many")]
    pub tracks: Vec<FavoriteTrack>,
    #[serde(rename = "@attr")]
    pub metadata: PageMetadata,
}

impl LovedTracksResponse {
    pub fn has_tracks(&self) -> bool {
        !self.loved_tracks.tracks.is_empty()
    }
}

fn number_from_any<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) if s.trim().is_empty() => Ok(0),
        NumberOrString::String(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}
