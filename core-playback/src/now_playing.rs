//! Now-playing snapshots and the gate deciding when they are republished.

use std::sync::Arc;

use bridge_traits::{Item, MediaHandle, MediaTime, NowPlayingInfo, NowPlayingPublisher};

/// Position drift below this is not worth republishing; hosts extrapolate
/// from rate and position on their own.
const POSITION_JUMP_SECS: i64 = 1;

/// Builds the now-playing info for `item`, reading transport values from the
/// live handle when there is one.
pub fn now_playing_info(item: &Item, handle: Option<&dyn MediaHandle>) -> NowPlayingInfo {
    let (locator, rate, duration, position) = match handle {
        Some(h) => (h.locator().to_string(), h.rate(), h.duration(), h.current_time()),
        None => (item.locator.clone(), 0.0, None, MediaTime::ZERO),
    };
    NowPlayingInfo {
        title: item.title.clone(),
        subtitle: item.subtitle.clone(),
        artwork: item.artwork.clone(),
        locator,
        rate,
        duration,
        position,
    }
}

/// Whether `next` differs enough from `previous` to be pushed again.
pub fn is_material_change(previous: &NowPlayingInfo, next: &NowPlayingInfo) -> bool {
    if previous.title != next.title
        || previous.subtitle != next.subtitle
        || previous.artwork != next.artwork
        || previous.locator != next.locator
        || previous.rate != next.rate
        || previous.duration != next.duration
    {
        return true;
    }
    let (a, b) = (previous.position, next.position);
    if a.is_valid() != b.is_valid() {
        return true;
    }
    if !a.is_valid() {
        return false;
    }
    let jump = if a >= b { a - b } else { b - a };
    jump >= MediaTime::new(POSITION_JUMP_SECS, 1)
}

/// Remembers what was last published so unchanged snapshots are skipped.
pub struct NowPlayingGate {
    publisher: Option<Arc<dyn NowPlayingPublisher>>,
    last: Option<NowPlayingInfo>,
}

impl NowPlayingGate {
    pub fn new(publisher: Option<Arc<dyn NowPlayingPublisher>>) -> Self {
        Self {
            publisher,
            last: None,
        }
    }

    /// Publishes `info` when forced or materially different from the last
    /// publication. Returns `true` if the publisher was called.
    pub fn offer(&mut self, info: NowPlayingInfo, force: bool) -> bool {
        let changed = match &self.last {
            Some(last) => force || is_material_change(last, &info),
            None => true,
        };
        if !changed {
            return false;
        }
        if let Some(publisher) = &self.publisher {
            publisher.publish(&info);
        }
        self.last = Some(info);
        true
    }

    /// Clears the published info. Returns `true` if something was showing.
    pub fn clear(&mut self) -> bool {
        if self.last.take().is_none() {
            return false;
        }
        if let Some(publisher) = &self.publisher {
            publisher.clear();
        }
        true
    }

    pub fn last(&self) -> Option<&NowPlayingInfo> {
        self.last.as_ref()
    }
}
