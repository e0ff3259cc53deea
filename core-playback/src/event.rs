//! Events consumed by the playback state machine.

use bridge_traits::{Item, MediaTime};

use crate::error::PlaybackError;

/// An input to the state machine, from either a command issuer or the
/// media engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Switch to `item`, or end the session when `None`.
    Change { item: Option<Item>, resuming: bool },
    Resume,
    Pause,
    Toggle,
    /// The live handle is ready to play (status or tracks loaded).
    Ready,
    /// The engine started playing.
    Playing,
    /// The engine stopped playing.
    Paused,
    /// Playback reached the end of the item.
    End,
    Error(PlaybackError),
    /// A video surface took over presentation.
    Video,
    /// Seek to an explicit position.
    Scrub(MediaTime),
}

impl PlaybackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackEvent::Change { item: Some(_), .. } => "Change",
            PlaybackEvent::Change { item: None, .. } => "Change(None)",
            PlaybackEvent::Resume => "Resume",
            PlaybackEvent::Pause => "Pause",
            PlaybackEvent::Toggle => "Toggle",
            PlaybackEvent::Ready => "Ready",
            PlaybackEvent::Playing => "Playing",
            PlaybackEvent::Paused => "Paused",
            PlaybackEvent::End => "End",
            PlaybackEvent::Error(_) => "Error",
            PlaybackEvent::Video => "Video",
            PlaybackEvent::Scrub(_) => "Scrub",
        }
    }

    /// Command events come from the command surface; the rest from the
    /// media engine.
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            PlaybackEvent::Change { .. }
                | PlaybackEvent::Resume
                | PlaybackEvent::Pause
                | PlaybackEvent::Toggle
                | PlaybackEvent::Video
                | PlaybackEvent::Scrub(_)
        )
    }
}
