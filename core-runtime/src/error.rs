//! Runtime error type shared by configuration, logging and bootstrap code.

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing settings (API credentials, page size, log filter)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host bridge the core needs was not provided
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A default bridge could not be constructed
    #[error("Bridge setup failed: {0}")]
    BridgeSetup(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, Error>;
