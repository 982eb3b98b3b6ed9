//! # Event Bus System
//!
//! Broadcasts typed events from the sync core to host subscribers using
//! `tokio::sync::broadcast`.
//!
//! Status surfaces (a dashboard, a notification, a CLI progress bar) subscribe
//! here instead of polling the orchestrator.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Started {
//!         job_id: "job-1".to_string(),
//!         users: 2,
//!     }))
//!     .ok();
//! ```
//!
//! `emit` fails when nobody is subscribed; publishers discard that with `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Envelope for everything published on the bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Favorites sync events
    Sync(SyncEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Started { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Events emitted by a loved-tracks import pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Pass started.
    Started {
        job_id: String,
        /// Number of users eligible for this pass.
        users: u32,
    },
    /// Progress update on the 0-100 scale.
    Progress {
        job_id: String,
        percent: u8,
        /// Current phase (e.g., "Fetching loved tracks for alice").
        phase: String,
    },
    /// One user's favorites were processed.
    UserCompleted {
        job_id: String,
        user_id: String,
        /// Songs matched to remote loved tracks.
        matched: u64,
    },
    /// Pass finished.
    Completed {
        job_id: String,
        users_processed: u32,
        tracks_matched: u64,
        duration_secs: u64,
    },
    /// Pass stopped because the caller cancelled it.
    Cancelled {
        job_id: String,
        users_processed: u32,
    },
    /// Pass aborted on an error that was not isolated to a single user.
    Failed { job_id: String, message: String },
}

impl SyncEvent {
    pub fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Favorites sync started",
            SyncEvent::Progress { .. } => "Favorites sync in progress",
            SyncEvent::UserCompleted { .. } => "User favorites synced",
            SyncEvent::Completed { .. } => "Favorites sync completed",
            SyncEvent::Cancelled { .. } => "Favorites sync cancelled",
            SyncEvent::Failed { .. } => "Favorites sync failed",
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            SyncEvent::Started { job_id, .. }
            | SyncEvent::Progress { job_id, .. }
            | SyncEvent::UserCompleted { job_id, .. }
            | SyncEvent::Completed { job_id, .. }
            | SyncEvent::Cancelled { job_id, .. }
            | SyncEvent::Failed { job_id, .. } => job_id,
        }
    }
}

/// Broadcast channel shared by publishers (behind an `Arc`) and any number
/// of subscribers. A subscriber more than `capacity` events behind gets
/// `RecvError::Lagged` and keeps receiving newer events.
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Number of subscribers reached; `Err` when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New subscriber; sees only events emitted after this call
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Subscriber with an optional predicate; events it rejects are skipped.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let problems = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Wait for the next accepted event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` after missing `n` events, `RecvError::Closed`
    /// once the bus is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |keep| keep(event))
    }
}
