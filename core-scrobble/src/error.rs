use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrobbleError {
    /// Connection refused, timeout, TLS failure. Never raised for HTTP status codes.
    #[error("Transport failure: {0}")]
    Transport(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No session key for the remote account")]
    MissingSession,
}

impl From<core_runtime::Error> for ScrobbleError {
    fn from(err: core_runtime::Error) -> Self {
        ScrobbleError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrobbleError>;
