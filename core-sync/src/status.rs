//! # Sync Status
//!
//! Explicit status value for the favorites sync, owned by one orchestrator
//! instance and readable by any number of status surfaces.
//!
//! ## State Machine
//!
//! ```text
//! Idle ──try_begin──> Running ──┬──> Idle
//!                               └──> Cancelled
//! Cancelled ──try_begin──> Running
//! ```
//!
//! `Running` is entered only through [`SyncStatusHandle::try_begin`], which
//! fails while another pass holds it. The returned [`SyncGuard`] leaves
//! `Running` on every exit path, including early returns and panics.

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Status of the favorites sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No pass running; the last one (if any) completed
    Idle,
    Running,
    /// No pass running; the last one was cancelled
    Cancelled,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Running => "running",
            SyncState::Cancelled => "cancelled",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            SyncState::Idle => 0,
            SyncState::Running => 1,
            SyncState::Cancelled => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SyncState::Running,
            2 => SyncState::Cancelled,
            _ => SyncState::Idle,
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared, cloneable view of the sync status
#[derive(Debug, Clone, Default)]
pub struct SyncStatusHandle {
    state: Arc<AtomicU8>,
}

impl SyncStatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_syncing(&self) -> bool {
        self.state() == SyncState::Running
    }

    /// Enter `Running`, or fail with `SyncInProgress` if a pass holds it.
    pub fn try_begin(&self) -> Result<SyncGuard> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if SyncState::from_u8(current) == SyncState::Running {
                return Err(SyncError::SyncInProgress);
            }
            match self.state.compare_exchange(
                current,
                SyncState::Running.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(SyncGuard {
                        handle: self.clone(),
                        exit_state: SyncState::Idle,
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Holds `Running` for one pass and releases it on drop.
#[derive(Debug)]
pub struct SyncGuard {
    handle: SyncStatusHandle,
    exit_state: SyncState,
}

impl SyncGuard {
    /// Leave `Running` as `Cancelled` instead of `Idle`
    pub fn mark_cancelled(&mut self) {
        self.exit_state = SyncState::Cancelled;
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.handle
            .state
            .store(self.exit_state.to_u8(), Ordering::Release);
    }
}
