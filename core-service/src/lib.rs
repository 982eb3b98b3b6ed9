//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, account store,
//! library store, user-data store) into the scrobble sync core. Desktop hosts
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so a `ReqwestHttpClient` is used when no HTTP bridge is
//! injected.
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ScrobbleApiConfig};
//! use core_service::ScrobbleService;
//!
//! let config = CoreConfig::builder()
//!     .api_config(ScrobbleApiConfig::from_env()?)
//!     .account_store(accounts)
//!     .library_store(library)
//!     .user_data_store(user_data)
//!     .build()?;
//!
//! let service = ScrobbleService::new(config)?;
//! host.register_task(Arc::new(service.import_task()));
//! ```

pub mod error;
pub mod task;

pub use error::{CoreError, Result};
pub use task::ImportLovedTracksTask;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::ReqwestHttpClient;

use std::sync::Arc;

use bridge_traits::{accounts::SessionKey, background::ProgressSink};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_scrobble::models::Acknowledged;
use core_scrobble::{ApiResponse, LovedTracksFetcher, ScrobbleClient};
use core_sync::{FavoritesSync, SyncOutcome, SyncStatusHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

const EVENT_BUS_CAPACITY: usize = 256;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct ScrobbleService {
    client: Arc<ScrobbleClient>,
    sync: Arc<FavoritesSync>,
    event_bus: Arc<EventBus>,
}

impl ScrobbleService {
    /// Create a new service from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Scrobble` if the API settings are rejected by the
    /// client.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let client = Arc::new(ScrobbleClient::new(
            Arc::clone(&config.http_client),
            config.api_config.clone(),
        )?);
        let event_bus = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));

        let sync = FavoritesSync::new(
            LovedTracksFetcher::new(Arc::clone(&client)),
            config.account_store,
            config.library_store,
            config.user_data_store,
        )
        .with_event_bus(Arc::clone(&event_bus));

        info!(host = %config.api_config.host, "Scrobble service initialized");

        Ok(Self {
            client,
            sync: Arc::new(sync),
            event_bus,
        })
    }

    /// Run one favorites sync pass.
    pub async fn sync_favorites(
        &self,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<SyncOutcome> {
        Ok(self.sync.run(cancel, progress).await?)
    }

    /// Status handle for status surfaces
    pub fn status(&self) -> SyncStatusHandle {
        self.sync.status()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub async fn love_track(
        &self,
        session_key: &SessionKey,
        artist: &str,
        track: &str,
    ) -> Result<ApiResponse<Acknowledged>> {
        Ok(self.client.love_track(session_key, artist, track).await?)
    }

    pub async fn unlove_track(
        &self,
        session_key: &SessionKey,
        artist: &str,
        track: &str,
    ) -> Result<ApiResponse<Acknowledged>> {
        Ok(self.client.unlove_track(session_key, artist, track).await?)
    }

    /// Scheduled task that runs favorites sync passes for the host's job framework.
    pub fn import_task(&self) -> ImportLovedTracksTask {
        ImportLovedTracksTask::new(Arc::clone(&self.sync))
    }
}
