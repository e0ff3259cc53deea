use thiserror::Error;

/// Failures reported by host collaborators.
///
/// The playback engine inspects the variant when a load fails:
/// `Unreachable` and `UnsupportedMedia` get their own session errors, the
/// rest are treated as decode failures.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The platform lacks the capability (no audio output, no media framework).
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The locator cannot be resolved or fetched.
    #[error("Media locator unreachable: {0}")]
    Unreachable(String),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
