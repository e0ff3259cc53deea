//! # Playback Error Types
//!
//! Failures a playback session can end up carrying in its state, plus the
//! fault raised when the engine itself is driven into an impossible state.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors carried by [`PlaybackState`](crate::state::PlaybackState).
///
/// These never cross the command boundary as return values. A caller learns
/// about them by observing the state the session settles in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Media Errors
    // ========================================================================
    /// The media engine lost track of a handle that had been ready.
    #[error("Media status became unknown")]
    MediaStatusUnknown,

    /// The media engine failed to load or decode the resource.
    #[error("Media failed to decode")]
    MediaDecodeFailed,

    /// The media engine logged an error entry. Diagnostic only; never carried
    /// by a state, only reported on the event bus.
    #[error("Media engine logged an error")]
    EndOfStreamLogged,

    /// The resource loaded but has neither an audio nor a video track, or its
    /// format is not supported by the engine.
    #[error("Unsupported media")]
    UnsupportedMedia,

    /// The locator proxy could not produce a loadable locator.
    #[error("Media unreachable")]
    MediaUnreachable,

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The platform refused to activate the audio session.
    #[error("Audio session activation failed")]
    SessionActivationFailed,

    /// The engine recovered from an internal fault.
    #[error("Unexpected playback error: {0}")]
    Unexpected(String),
}

impl PlaybackError {
    /// Maps a failed `MediaEngine::load` onto the session taxonomy.
    pub fn from_load_error(error: &BridgeError) -> Self {
        match error {
            BridgeError::UnsupportedMedia(_) => PlaybackError::UnsupportedMedia,
            BridgeError::Unreachable(_) => PlaybackError::MediaUnreachable,
            _ => PlaybackError::MediaDecodeFailed,
        }
    }

    /// Returns `true` if asking for the same item again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaybackError::MediaStatusUnknown
                | PlaybackError::MediaUnreachable
                | PlaybackError::SessionActivationFailed
        )
    }
}

/// Internal faults of the playback engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    /// An event arrived that the current state has no transition for.
    #[error("Invariant violation: {event} in state {state}")]
    InvariantViolation { state: String, event: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_mapping() {
        assert_eq!(
            PlaybackError::from_load_error(&BridgeError::UnsupportedMedia("flac".into())),
            PlaybackError::UnsupportedMedia
        );
        assert_eq!(
            PlaybackError::from_load_error(&BridgeError::Unreachable("offline".into())),
            PlaybackError::MediaUnreachable
        );
        assert_eq!(
            PlaybackError::from_load_error(&BridgeError::OperationFailed("codec".into())),
            PlaybackError::MediaDecodeFailed
        );
    }

    #[test]
    fn test_retryable() {
        assert!(PlaybackError::MediaUnreachable.is_retryable());
        assert!(!PlaybackError::MediaDecodeFailed.is_retryable());
        assert!(!PlaybackError::Unexpected("boom".into()).is_retryable());
    }

    #[test]
    fn test_fault_display() {
        let fault = EngineFault::InvariantViolation {
            state: "Paused(ep-1)".to_string(),
            event: "End".to_string(),
        };
        assert_eq!(fault.to_string(), "Invariant violation: End in state Paused(ep-1)");
    }
}
