//! Playback bridge traits and supporting media types.
//!
//! These abstractions let the playback engine drive a platform media
//! framework (AVFoundation, ExoPlayer, GStreamer) without knowing which one
//! is in use. Host applications provide concrete implementations of
//! [`MediaEngine`] and [`MediaHandle`] and, optionally, publish now-playing
//! information and queue navigation.
//!
//! ## Threading
//!
//! Transport calls on a [`MediaHandle`] (`play`, `pause`, `seek`, the
//! readouts) are made from the engine's executor and must return promptly.
//! [`MediaEngine::load`], [`MediaHandle::attach_observer`] and
//! [`MediaHandle::detach_observers`] are only ever called from the engine's
//! worker thread and may block.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::time::{MediaTime, TimeRange};

/// Opaque identity of a playable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Media kind an item declares up front. The kind actually played is decided
/// by the tracks the engine loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    None,
    Audio,
    Video,
}

/// A uniquely identified playable unit.
///
/// Two items are equal when their ids are equal; the locator and display
/// metadata may change between feed refreshes without changing identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Local path or remote URL of the media resource.
    pub locator: String,
    pub kind: MediaKind,
    pub title: String,
    pub subtitle: Option<String>,
    /// Reference to artwork the now-playing publisher can resolve.
    pub artwork: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, locator: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
            kind,
            title: String::new(),
            subtitle: None,
            artwork: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of a track loaded by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
    Text,
    Other,
}

/// A track inside a loaded media resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub kind: TrackKind,
    pub enabled: bool,
}

impl MediaTrack {
    pub fn audio() -> Self {
        Self {
            kind: TrackKind::Audio,
            enabled: true,
        }
    }

    pub fn video() -> Self {
        Self {
            kind: TrackKind::Video,
            enabled: true,
        }
    }
}

/// Load status of a media handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaStatus {
    Unknown,
    ReadyToPlay,
    Failed(String),
}

/// Unique identifier of one loaded media handle.
///
/// A fresh id is minted for every load, so callbacks issued for a replaced
/// handle can be told apart from callbacks of the live one even when both
/// point at the same locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion callback for [`MediaHandle::seek`]. Receives `true` when the
/// seek finished and `false` when it was cancelled or superseded.
pub type SeekCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// Signals a media handle reports about itself.
///
/// Implementations of [`MediaHandle`] call these from whatever thread the
/// platform delivers notifications on. The engine's implementation only
/// enqueues, so calls never block.
pub trait MediaObserver: Send + Sync {
    fn status_changed(&self, status: MediaStatus);

    /// The set of loaded tracks changed; read them through [`MediaHandle::tracks`].
    fn tracks_changed(&self);

    fn duration_changed(&self, duration: Option<MediaTime>);

    /// Playback rate changed; `0.0` means paused.
    fn rate_changed(&self, rate: f32);

    fn reached_end(&self);

    /// The platform recorded an entry in its error log. Diagnostic only.
    fn error_logged(&self, message: String);
}

/// One loaded media resource with transport controls.
pub trait MediaHandle: Send + Sync {
    fn locator(&self) -> &str;

    fn status(&self) -> MediaStatus;

    fn play(&self);

    fn pause(&self);

    /// Seek to `position`. `on_complete` must be called exactly once.
    fn seek(&self, position: MediaTime, on_complete: SeekCompletion);

    /// Cancel every pending seek; their completions receive `false`.
    fn cancel_pending_seeks(&self);

    fn current_time(&self) -> MediaTime;

    /// `None` while unknown or indefinite (live streams).
    fn duration(&self) -> Option<MediaTime>;

    fn rate(&self) -> f32;

    fn seekable_ranges(&self) -> Vec<TimeRange>;

    /// `None` until the resource's tracks have been loaded.
    fn tracks(&self) -> Option<Vec<MediaTrack>>;

    /// Attach an observer. Implementations must immediately report the
    /// current status to it, then every subsequent change.
    fn attach_observer(&self, observer: Arc<dyn MediaObserver>);

    /// Detach every observer. No observer callback may start after this
    /// returns.
    fn detach_observers(&self);
}

/// Factory for media handles.
pub trait MediaEngine: Send + Sync {
    /// Begin loading `locator`. Fails for locators the platform rejects
    /// outright; asynchronous failures are reported through the observer.
    fn load(&self, locator: &str) -> Result<Arc<dyn MediaHandle>>;
}

/// Snapshot published to the OS now-playing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: String,
    pub subtitle: Option<String>,
    pub artwork: Option<String>,
    pub locator: String,
    pub rate: f32,
    pub duration: Option<MediaTime>,
    pub position: MediaTime,
}

/// Renders now-playing information (lock screen, control center, MPRIS).
pub trait NowPlayingPublisher: Send + Sync {
    fn publish(&self, info: &NowPlayingInfo);

    fn clear(&self);
}

/// Supplies neighbouring items for next/previous commands.
pub trait QueueNavigator: Send + Sync {
    fn next_item(&self, current: Option<&ItemId>) -> Option<Item>;

    fn previous_item(&self, current: Option<&ItemId>) -> Option<Item>;
}
