//! # Favorites Sync
//!
//! Imports each user's remote loved tracks as local favorites.
//!
//! ## Workflow
//!
//! 1. Claim the sync status (`Idle`/`Cancelled` → `Running`); a pass that is
//!    already running makes this fail with `SyncError::SyncInProgress`
//! 2. List accounts and keep those with sync enabled and a session key
//! 3. For each account, in order:
//!    - list the user's local artists
//!    - fetch every loved track (progress within the user's slice of 0-100)
//!    - group the loved tracks by artist identity
//!    - for each local artist with an identity and a non-empty group, match
//!      each of its songs and mark matches as favorites
//! 4. Release the status as `Idle`, or `Cancelled` if cancellation was seen
//!
//! Users are processed sequentially. A store failure while processing one
//! user is logged and the pass moves on to the next user.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let sync = FavoritesSync::new(fetcher, accounts, library, user_data)
//!     .with_event_bus(event_bus);
//!
//! let status = sync.status();
//! let outcome = sync.run(&cancel, &progress).await?;
//! assert!(!status.is_syncing());
//! ```

use crate::job::{SyncJobId, SyncOutcome, SyncReport, UserSyncReport};
use crate::matcher::{find_match, group_by_artist};
use crate::status::{SyncGuard, SyncState, SyncStatusHandle};
use crate::Result;
use bridge_traits::accounts::{AccountStore, ScrobbleAccount};
use bridge_traits::background::ProgressSink;
use bridge_traits::library::LibraryStore;
use bridge_traits::user_data::UserDataStore;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_scrobble::{LovedTracksFetcher, ProgressRange};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Orchestrates favorites sync passes
pub struct FavoritesSync {
    fetcher: LovedTracksFetcher,
    accounts: Arc<dyn AccountStore>,
    library: Arc<dyn LibraryStore>,
    user_data: Arc<dyn UserDataStore>,
    event_bus: Option<Arc<EventBus>>,
    status: SyncStatusHandle,
}

impl FavoritesSync {
    pub fn new(
        fetcher: LovedTracksFetcher,
        accounts: Arc<dyn AccountStore>,
        library: Arc<dyn LibraryStore>,
        user_data: Arc<dyn UserDataStore>,
    ) -> Self {
        Self {
            fetcher,
            accounts,
            library,
            user_data,
            event_bus: None,
            status: SyncStatusHandle::new(),
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Handle for status surfaces; stays valid after the pass ends
    pub fn status(&self) -> SyncStatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> SyncState {
        self.status.state()
    }

    pub fn is_syncing(&self) -> bool {
        self.status.is_syncing()
    }

    /// Run one pass to completion or cancellation.
    ///
    /// # Errors
    ///
    /// - `SyncError::SyncInProgress` if another pass is running
    /// - `SyncError::Store` if the account list cannot be read
    ///
    /// Cancellation is not an error: it yields `SyncOutcome::Cancelled`.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<SyncOutcome> {
        let mut guard = self.status.try_begin()?;
        let job_id = SyncJobId::new();
        let mut report = SyncReport::new(job_id);

        let accounts = match self.accounts.list_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to list scrobble accounts");
                self.emit(SyncEvent::Failed {
                    job_id: job_id.to_string(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let eligible: Vec<ScrobbleAccount> = accounts
            .into_iter()
            .filter(ScrobbleAccount::is_sync_eligible)
            .collect();

        if eligible.is_empty() {
            info!("No users found with favorites sync enabled");
            return Ok(SyncOutcome::Completed(report.finish()));
        }

        info!(job_id = %job_id, users = eligible.len(), "Starting favorites sync");
        self.emit(SyncEvent::Started {
            job_id: job_id.to_string(),
            users: eligible.len() as u32,
        });

        let total = eligible.len();
        for (index, account) in eligible.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(self.cancelled(&mut guard, report));
            }

            let range = ProgressRange::slice(index, total);
            let reporter = EventProgress {
                inner: progress,
                sync: self,
                job_id,
                phase: format!("Importing loved tracks for {}", account.display_name),
            };

            match self.sync_user(account, range, &reporter, cancel).await {
                Ok(user_report) => {
                    self.emit(SyncEvent::UserCompleted {
                        job_id: job_id.to_string(),
                        user_id: account.user_id.clone(),
                        matched: user_report.matched,
                    });
                    report.users.push(user_report);
                }
                Err(e) => {
                    warn!(
                        user = %account.display_name,
                        error = %e,
                        "Favorites sync failed for user, continuing with next user"
                    );
                    report.failed_users.push(account.user_id.clone());
                }
            }
        }

        if cancel.is_cancelled() {
            return Ok(self.cancelled(&mut guard, report));
        }

        let report = report.finish();
        info!(
            job_id = %job_id,
            users = report.users.len(),
            failed = report.failed_users.len(),
            matched = report.tracks_matched(),
            written = report.favorites_written(),
            "Favorites sync completed"
        );
        self.emit(SyncEvent::Completed {
            job_id: job_id.to_string(),
            users_processed: report.users.len() as u32,
            tracks_matched: report.tracks_matched(),
            duration_secs: report.duration_secs(),
        });

        Ok(SyncOutcome::Completed(report))
    }

    #[instrument(skip_all, fields(user = %account.display_name))]
    async fn sync_user(
        &self,
        account: &ScrobbleAccount,
        range: ProgressRange,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<UserSyncReport> {
        info!("Syncing loved tracks");
        let mut report = UserSyncReport::new(account.user_id.as_str());

        let artists = self.library.list_artists(&account.user_id).await?;
        let fetched = self.fetcher.fetch_all(account, range, progress, cancel).await;
        report.remote_tracks = fetched.tracks.len();
        report.fetch_stop = Some(fetched.stop.clone());

        if fetched.is_empty() {
            info!("User has no loved tracks on the scrobble service");
            return Ok(report);
        }

        let groups = group_by_artist(fetched.into_tracks());
        if groups.ungrouped() > 0 {
            debug!(
                ungrouped = groups.ungrouped(),
                "Loved tracks without artist identity cannot be matched"
            );
        }

        for artist in &artists {
            if cancel.is_cancelled() {
                debug!("Cancellation requested, stopping artist scan");
                break;
            }

            let Some(identity) = artist.artist_identity() else {
                continue;
            };
            let Some(tracks) = groups.tracks_for(identity) else {
                continue;
            };

            debug!(
                artist = %artist.name,
                loved = tracks.len(),
                "Found loved tracks for artist"
            );

            let songs = self.library.list_songs(&artist.id, &account.user_id).await?;
            for song in &songs {
                let Some(track) = find_match(tracks, song) else {
                    continue;
                };

                report.matched += 1;
                if self.user_data.is_favorite(&account.user_id, &song.id).await? {
                    report.already_favorite += 1;
                    continue;
                }

                self.user_data
                    .set_favorite(&account.user_id, &song.id, true)
                    .await?;
                report.favorites_written += 1;
                debug!(song = %song.name, remote = %track.name, "Found library match");
            }
        }

        info!(
            matched = report.matched,
            written = report.favorites_written,
            "Finished loved tracks sync"
        );
        Ok(report)
    }

    fn cancelled(&self, guard: &mut SyncGuard, report: SyncReport) -> SyncOutcome {
        guard.mark_cancelled();
        let report = report.finish();
        info!(
            job_id = %report.job_id,
            users = report.users.len(),
            "Favorites sync cancelled"
        );
        self.emit(SyncEvent::Cancelled {
            job_id: report.job_id.to_string(),
            users_processed: report.users.len() as u32,
        });
        SyncOutcome::Cancelled(report)
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }
}

/// Forwards progress to the host sink and mirrors it on the event bus
struct EventProgress<'a> {
    inner: &'a dyn ProgressSink,
    sync: &'a FavoritesSync,
    job_id: SyncJobId,
    phase: String,
}

impl ProgressSink for EventProgress<'_> {
    fn report(&self, percent: f64) {
        self.inner.report(percent);
        self.sync.emit(SyncEvent::Progress {
            job_id: self.job_id.to_string(),
            percent: percent.clamp(0.0, 100.0).round() as u8,
            phase: self.phase.clone(),
        });
    }
}
