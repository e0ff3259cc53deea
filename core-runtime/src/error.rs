use thiserror::Error;

/// Errors raised while wiring up the playback runtime.
///
/// Playback failures themselves never surface here; they are carried by
/// the session state.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
