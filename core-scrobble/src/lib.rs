//! # Scrobble Service Client
//!
//! Signed access to a Last.fm-compatible scrobble web service.
//!
//! ## Overview
//!
//! This module handles:
//! - Request signing (`api_sig`, MD5 over the sorted parameters and secret)
//! - Query string and form body encoding
//! - Signed GET/POST with tolerant JSON classification
//! - Draining the paginated loved-tracks list with progress and cancellation

pub mod client;
pub mod error;
pub mod models;
pub mod pager;
pub mod query;
pub mod signing;

pub use client::ScrobbleClient;
pub use error::{Result, ScrobbleError};
pub use models::{
    ApiError, ApiResponse, FavoriteTrack, GetLovedTracks, LoveTrack, LovedTracksResponse,
    PageMetadata, ScrobbleRequest,
};
pub use pager::{FetchStop, FetchedFavorites, LovedTracksFetcher, ProgressRange};
pub use query::{to_form_body, to_query_string};
pub use signing::{sign, RequestParameters};
