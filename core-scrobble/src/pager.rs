//! Loved-tracks pagination.
//!
//! Drains `user.getLovedTracks` page by page (1-indexed) and reports progress
//! inside the caller's slice of the 0-100 range. A page that fails for any
//! reason ends the loop; whatever was accumulated is kept.

use crate::client::ScrobbleClient;
use crate::error::ScrobbleError;
use crate::models::{ApiError, ApiResponse, FavoriteTrack, GetLovedTracks, LovedTracksResponse};
use bridge_traits::accounts::ScrobbleAccount;
use bridge_traits::background::ProgressSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Slice of the 0-100 progress scale owned by one fetch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub start: f64,
    pub end: f64,
}

impl ProgressRange {
    pub const FULL: ProgressRange = ProgressRange {
        start: 0.0,
        end: 100.0,
    };

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The `index`-th of `count` equal slices of the full range
    pub fn slice(index: usize, count: usize) -> Self {
        let count = count.max(1) as f64;
        Self {
            start: index as f64 / count * 100.0,
            end: (index + 1) as f64 / count * 100.0,
        }
    }

    /// `fraction * (end - start) + start`
    pub fn at(&self, fraction: f64) -> f64 {
        fraction * (self.end - self.start) + self.start
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStop {
    /// The last page reported by the service was fetched
    Completed,
    /// A page came back with no tracks
    EmptyPage,
    ServiceError(ApiError),
    Malformed,
    /// Transport failure; earlier pages are kept
    Transport(String),
    /// The client rejected the request before sending it
    RequestFailed(String),
    Cancelled,
}

/// Tracks gathered from every page fetched before pagination stopped
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedFavorites {
    pub tracks: Vec<FavoriteTrack>,
    /// Requests issued, including the one that stopped the loop
    pub requests: u32,
    pub stop: FetchStop,
}

impl FetchedFavorites {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<FavoriteTrack> {
        self.tracks
    }
}

/// Fetches every loved track for an account
pub struct LovedTracksFetcher {
    client: Arc<ScrobbleClient>,
}

impl LovedTracksFetcher {
    pub fn new(client: Arc<ScrobbleClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ScrobbleClient {
        &self.client
    }

    /// Fetch all pages of the account's loved tracks.
    ///
    /// Cancellation is checked before each page request; a cancelled fetch
    /// returns the pages already fetched, not an error.
    #[instrument(skip_all, fields(user = %account.remote_username))]
    pub async fn fetch_all(
        &self,
        account: &ScrobbleAccount,
        range: ProgressRange,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> FetchedFavorites {
        let page_size = self.client.config().page_size;
        let mut tracks = Vec::new();
        let mut requests = 0;
        let mut page = 1;

        let stop = loop {
            if cancel.is_cancelled() {
                debug!(page, "Fetch cancelled before page request");
                break FetchStop::Cancelled;
            }

            let mut request = GetLovedTracks::new(account.remote_username.as_str(), page, page_size);
            if let Some(key) = account.credential() {
                request = request.with_session_key(key.clone());
            }

            requests += 1;
            let response = match self.client.get::<_, LovedTracksResponse>(&request).await {
                Ok(response) => response,
                Err(ScrobbleError::Transport(e)) => {
                    warn!(page, error = %e, "Transport failure, keeping fetched pages");
                    break FetchStop::Transport(e.to_string());
                }
                Err(e) => {
                    warn!(page, error = %e, "Request failed, keeping fetched pages");
                    break FetchStop::RequestFailed(e.to_string());
                }
            };

            let body = match response {
                ApiResponse::Success(body) => body,
                ApiResponse::ServiceError(err) => break FetchStop::ServiceError(err),
                ApiResponse::Malformed(_) => break FetchStop::Malformed,
            };

            if !body.has_tracks() {
                break FetchStop::EmptyPage;
            }

            let loved = body.loved_tracks;
            let metadata = loved.metadata;
            tracks.extend(loved.tracks);

            let percent = range.at(metadata.fraction());
            debug!(
                page = metadata.page,
                total_pages = metadata.total_pages,
                percent,
                "Fetched loved tracks page"
            );
            progress.report(percent);

            if metadata.is_last_page() || page >= metadata.total_pages {
                break FetchStop::Completed;
            }
            page += 1;
        };

        info!(
            tracks = tracks.len(),
            requests,
            stop = ?stop,
            "Retrieved loved tracks"
        );

        FetchedFavorites {
            tracks,
            requests,
            stop,
        }
    }
}
