//! Error type returned across the host bridge boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host does not provide this capability
    #[error("Capability not available: {0}")]
    NotAvailable(String),

    /// Transport failure or a host operation that could not complete
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Account, library or user-data store failure
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
