//! # Host Bridge Traits
//!
//! Contracts between the scrobble-sync core and the media server hosting it.
//!
//! ## Overview
//!
//! The core never talks to the host's catalog, user data or configuration
//! directly. Each capability it needs is a trait here, implemented by the
//! host (or by `bridge-desktop` for the HTTP transport).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP with optional retry
//!
//! ### Host data
//! - [`AccountStore`](accounts::AccountStore) - Linked accounts, session keys, sync toggles
//! - [`LibraryStore`](library::LibraryStore) - Artists and their songs per user
//! - [`UserDataStore`](user_data::UserDataStore) - Per-user favorite flags
//!
//! ### Host integration
//! - [`ScheduledTask`](background::ScheduledTask) - Job entry point with cancellation
//! - [`ProgressSink`](background::ProgressSink) - 0–100 progress reporting
//! - [`LoggerSink`](logger::LoggerSink) - Forward structured logs to the host
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert host-specific failures into it with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across
//! async tasks behind `Arc<dyn _>`.

pub mod accounts;
pub mod background;
pub mod error;
pub mod http;
pub mod library;
pub mod logger;
pub mod user_data;

pub use error::BridgeError;

// Re-export commonly used types
pub use accounts::{AccountOptions, AccountStore, ScrobbleAccount, SessionKey};
pub use background::{NoopProgress, ProgressSink, ScheduledTask, TaskTrigger};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use library::{LibraryStore, LocalArtist, LocalSong};
pub use logger::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use user_data::UserDataStore;
