use thiserror::Error;

/// Errors returned by TCP segment extraction.
#[derive(Debug, Error)]
pub enum TcpError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("missing network layer in packet")]
    MissingNetworkLayer,
}
