//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the scrobble sync core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the API client and the sync
//! orchestrator depend on. It establishes the logging conventions and the
//! event broadcasting used to surface sync status to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
