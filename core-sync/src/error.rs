use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("A favorites sync pass is already running")]
    SyncInProgress,

    #[error("Host store error: {0}")]
    Store(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
