//! # Sync Job Reports
//!
//! Identifiers and result types for one favorites sync pass.

use chrono::{DateTime, Utc};
use core_scrobble::FetchStop;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened for one user
#[derive(Debug, Clone, PartialEq)]
pub struct UserSyncReport {
    pub user_id: String,
    /// Loved tracks fetched from the service
    pub remote_tracks: usize,
    /// Local songs that matched a loved track
    pub matched: u64,
    /// Favorite flags actually written
    pub favorites_written: u64,
    /// Matched songs that were already favorites
    pub already_favorite: u64,
    pub fetch_stop: Option<FetchStop>,
}

impl UserSyncReport {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            remote_tracks: 0,
            matched: 0,
            favorites_written: 0,
            already_favorite: 0,
            fetch_stop: None,
        }
    }
}

/// Summary of a whole pass
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub job_id: SyncJobId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub users: Vec<UserSyncReport>,
    /// Users whose processing hit a store error
    pub failed_users: Vec<String>,
}

impl SyncReport {
    pub fn new(job_id: SyncJobId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            started_at: now,
            finished_at: now,
            users: Vec::new(),
            failed_users: Vec::new(),
        }
    }

    pub fn tracks_matched(&self) -> u64 {
        self.users.iter().map(|u| u.matched).sum()
    }

    pub fn favorites_written(&self) -> u64 {
        self.users.iter().map(|u| u.favorites_written).sum()
    }

    pub fn duration_secs(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

/// How a pass ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Cancelled(SyncReport),
}

impl SyncOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncOutcome::Cancelled(_))
    }

    pub fn report(&self) -> &SyncReport {
        match self {
            SyncOutcome::Completed(report) | SyncOutcome::Cancelled(report) => report,
        }
    }
}
