//! # Playback State
//!
//! The closed set of states a playback session can be in. Exactly one state
//! is live per engine; everyone else sees immutable clones of it.

use std::fmt;
use std::sync::Arc;

use bridge_traits::{HandleId, Item, MediaHandle, MediaTime};
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Point-in-time view of a media handle.
///
/// Always recomputed from the handle; never mutated on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub locator: String,
    pub rate: f32,
    pub duration: Option<MediaTime>,
    pub position: MediaTime,
}

impl AssetSnapshot {
    pub fn capture(handle: &dyn MediaHandle) -> Self {
        Self {
            locator: handle.locator().to_string(),
            rate: handle.rate(),
            duration: handle.duration(),
            position: handle.current_time(),
        }
    }
}

/// Shared reference to the live media handle, compared by load identity.
#[derive(Clone)]
pub struct HandleRef {
    id: HandleId,
    handle: Arc<dyn MediaHandle>,
}

impl HandleRef {
    pub fn new(id: HandleId, handle: Arc<dyn MediaHandle>) -> Self {
        Self { id, handle }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn handle(&self) -> &Arc<dyn MediaHandle> {
        &self.handle
    }

    pub fn snapshot(&self) -> AssetSnapshot {
        AssetSnapshot::capture(self.handle.as_ref())
    }
}

impl PartialEq for HandleRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRef")
            .field("id", &self.id)
            .field("locator", &self.handle.locator())
            .finish()
    }
}

/// State of a playback session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    /// No item; the audio session is released.
    Inactive { error: Option<PlaybackError> },
    /// An item is selected but not playing. A carried error explains why
    /// playback stopped or never started.
    Paused {
        item: Item,
        asset: Option<AssetSnapshot>,
        error: Option<PlaybackError>,
    },
    /// Waiting for the media engine. `resuming` records whether playback
    /// should start once the item is ready.
    Preparing { item: Item, resuming: bool },
    /// Playing an item without video.
    Listening { item: Item, asset: AssetSnapshot },
    /// Playing an item with video; the UI renders from the handle.
    Viewing { item: Item, handle: HandleRef },
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Inactive { error: None }
    }
}

impl PlaybackState {
    pub fn item(&self) -> Option<&Item> {
        match self {
            PlaybackState::Inactive { .. } => None,
            PlaybackState::Paused { item, .. }
            | PlaybackState::Preparing { item, .. }
            | PlaybackState::Listening { item, .. }
            | PlaybackState::Viewing { item, .. } => Some(item),
        }
    }

    pub fn error(&self) -> Option<&PlaybackError> {
        match self {
            PlaybackState::Inactive { error } | PlaybackState::Paused { error, .. } => {
                error.as_ref()
            }
            _ => None,
        }
    }

    /// Lowercase name of the state case, as used in events and logs.
    pub fn case(&self) -> &'static str {
        match self {
            PlaybackState::Inactive { .. } => "inactive",
            PlaybackState::Paused { .. } => "paused",
            PlaybackState::Preparing { .. } => "preparing",
            PlaybackState::Listening { .. } => "listening",
            PlaybackState::Viewing { .. } => "viewing",
        }
    }

    pub fn is_inactive(&self) -> bool {
        matches!(self, PlaybackState::Inactive { .. })
    }

    /// `true` while playing, or while preparing with playback requested.
    pub fn is_playing_or_requested(&self) -> bool {
        match self {
            PlaybackState::Listening { .. } | PlaybackState::Viewing { .. } => true,
            PlaybackState::Preparing { resuming, .. } => *resuming,
            PlaybackState::Inactive { .. } | PlaybackState::Paused { .. } => false,
        }
    }

    /// Same case and same carried error, whatever the item.
    ///
    /// State observers are only notified when this is `false`. Item changes
    /// within a case reach hosts through the now-playing publisher.
    pub fn same_case_and_error(&self, other: &PlaybackState) -> bool {
        self.case() == other.case() && self.error() == other.error()
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Inactive { error: None } => write!(f, "Inactive"),
            PlaybackState::Inactive { error: Some(e) } => write!(f, "Inactive({})", e),
            PlaybackState::Paused {
                item, error: None, ..
            } => write!(f, "Paused({})", item.id),
            PlaybackState::Paused {
                item,
                error: Some(e),
                ..
            } => write!(f, "Paused({}, {})", item.id, e),
            PlaybackState::Preparing { item, resuming } => {
                write!(f, "Preparing({}, resuming: {})", item.id, resuming)
            }
            PlaybackState::Listening { item, .. } => write!(f, "Listening({})", item.id),
            PlaybackState::Viewing { item, .. } => write!(f, "Viewing({})", item.id),
        }
    }
}

/// Receives state changes.
///
/// Called on the playback executor when the state case or carried error
/// changes. Implementations must return promptly.
pub trait StateObserver: Send + Sync {
    fn on_state_changed(&self, state: &PlaybackState);
}

impl<F> StateObserver for F
where
    F: Fn(&PlaybackState) + Send + Sync,
{
    fn on_state_changed(&self, state: &PlaybackState) {
        self(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MediaKind;

    fn episode(id: &str) -> Item {
        Item::new(id, format!("https://cdn.example.com/{}.mp3", id), MediaKind::Audio)
    }

    fn paused(id: &str, error: Option<PlaybackError>) -> PlaybackState {
        PlaybackState::Paused {
            item: episode(id),
            asset: None,
            error,
        }
    }

    #[test]
    fn test_default_is_inactive_without_error() {
        let state = PlaybackState::default();
        assert!(state.is_inactive());
        assert!(state.item().is_none());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_same_case_ignores_snapshot() {
        let a = PlaybackState::Paused {
            item: episode("ep-1"),
            asset: None,
            error: None,
        };
        let b = PlaybackState::Paused {
            item: episode("ep-1"),
            asset: Some(AssetSnapshot {
                locator: "x".into(),
                rate: 0.0,
                duration: None,
                position: MediaTime::from_seconds(3.0),
            }),
            error: None,
        };
        assert_ne!(a, b);
        assert!(a.same_case_and_error(&b));
    }

    #[test]
    fn test_error_change_is_significant() {
        let ok = paused("ep-1", None);
        let failed = paused("ep-1", Some(PlaybackError::MediaDecodeFailed));
        assert!(!ok.same_case_and_error(&failed));
        assert!(paused("ep-1", None).same_case_and_error(&paused("ep-2", None)));
    }

    #[test]
    fn test_playing_or_requested() {
        let preparing = |resuming| PlaybackState::Preparing {
            item: episode("ep-1"),
            resuming,
        };
        assert!(preparing(true).is_playing_or_requested());
        assert!(!preparing(false).is_playing_or_requested());
        assert!(!paused("ep-1", None).is_playing_or_requested());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            paused("ep-1", Some(PlaybackError::MediaUnreachable)).to_string(),
            "Paused(ep-1, Media unreachable)"
        );
        assert_eq!(PlaybackState::default().to_string(), "Inactive");
    }

    #[test]
    fn test_closure_observer() {
        let seen = parking_lot::Mutex::new(Vec::new());
        let observer = |state: &PlaybackState| seen.lock().push(state.case());
        observer.on_state_changed(&PlaybackState::default());
        assert_eq!(*seen.lock(), vec!["inactive"]);
    }
}
