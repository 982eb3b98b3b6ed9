//! # Favorites Sync Module
//!
//! Imports loved tracks from the scrobble service into the local library's
//! per-user favorite flags.
//!
//! ## Overview
//!
//! This module manages:
//! - Grouping remote loved tracks by artist identity
//! - Loose name matching of local songs against loved tracks
//! - Idempotent favorite writes through the host's user-data store
//! - The sync status (`Idle`, `Running`, `Cancelled`) and its reset on exit
//!
//! ## Components
//!
//! - **Matcher** (`matcher`): Name normalization and artist grouping
//! - **Status** (`status`): Shared status handle and the guard that owns `Running`
//! - **Job** (`job`): Job identifiers and per-pass reports
//! - **Favorites Sync** (`favorites`): Orchestrates users, artists and songs

pub mod error;
pub mod favorites;
pub mod job;
pub mod matcher;
pub mod status;

pub use error::{Result, SyncError};
pub use favorites::FavoritesSync;
pub use job::{SyncJobId, SyncOutcome, SyncReport, UserSyncReport};
pub use matcher::{find_match, group_by_artist, names_match, normalize_name, ArtistGroup};
pub use status::{SyncGuard, SyncState, SyncStatusHandle};
