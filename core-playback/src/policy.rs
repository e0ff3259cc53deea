//! # Playback Policies
//!
//! Pure arithmetic behind resuming and position persistence. All positions
//! are rational [`MediaTime`] values and every comparison is exact.

use bridge_traits::{MediaTime, MediaTrack, TimeRange, TrackKind};

/// What to do with an item's timestamp at a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampDecision {
    /// Too close to the start to be worth remembering.
    Remove,
    Normal(MediaTime),
    Finished(MediaTime),
}

/// Classifies positions for persistence.
///
/// With margin `m`, position `p` and known duration `d`: `p < m` removes the
/// timestamp, `p >= d - m` marks the item finished, anything else is stored
/// as a normal resume point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampPolicy {
    pub margin: MediaTime,
}

impl TimestampPolicy {
    pub fn new(margin: MediaTime) -> Self {
        Self { margin }
    }

    pub fn classify(&self, position: MediaTime, duration: Option<MediaTime>) -> TimestampDecision {
        if !position.is_valid() || position < self.margin {
            return TimestampDecision::Remove;
        }
        match duration {
            Some(d) if d.is_valid() && position >= d - self.margin => {
                TimestampDecision::Finished(position)
            }
            _ => TimestampDecision::Normal(position),
        }
    }
}

/// Computes where playback resumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumePolicy {
    pub lookback: MediaTime,
}

impl ResumePolicy {
    pub fn new(lookback: MediaTime) -> Self {
        Self { lookback }
    }

    /// Stored position minus the look-back, floored at zero and moved to the
    /// start of the first seekable range when it falls outside all of them.
    ///
    /// Engines that report no ranges (still buffering metadata) keep the
    /// candidate.
    pub fn target(&self, stored: Option<MediaTime>, seekable: &[TimeRange]) -> MediaTime {
        let stored = stored.filter(MediaTime::is_valid).unwrap_or(MediaTime::ZERO);
        let candidate = (stored - self.lookback).max(MediaTime::ZERO);
        clamp_to_ranges(candidate, seekable)
    }
}

/// Clamps an explicit seek position into `[0, duration]`.
pub fn clamp_scrub(position: MediaTime, duration: Option<MediaTime>) -> MediaTime {
    let position = if position.is_valid() {
        position.max(MediaTime::ZERO)
    } else {
        MediaTime::ZERO
    };
    match duration {
        Some(d) if d.is_valid() => position.min(d),
        _ => position,
    }
}

fn clamp_to_ranges(candidate: MediaTime, seekable: &[TimeRange]) -> MediaTime {
    match seekable.first() {
        Some(first) if !seekable.iter().any(|range| range.contains(candidate)) => first.start,
        _ => candidate,
    }
}

/// How a loaded item is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Listening,
    Viewing,
    /// Neither an audio nor a video track is enabled.
    Unsupported,
}

/// Any enabled video track wins over audio.
pub fn presentation(tracks: &[MediaTrack]) -> Presentation {
    let enabled = |kind| tracks.iter().any(|t| t.enabled && t.kind == kind);
    if enabled(TrackKind::Video) {
        Presentation::Viewing
    } else if enabled(TrackKind::Audio) {
        Presentation::Listening
    } else {
        Presentation::Unsupported
    }
}
