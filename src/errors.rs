use thiserror::Error;

/// Errors from the feed harness.
///
/// The matching core itself has no recoverable failures; malformed input
/// there is a caller bug, not an error.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid simulation config: {0}")]
    Config(String),

    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
