//! Audio Session and Locator Resolution
//!
//! Platforms gate audio output behind a session object (AVAudioSession,
//! Android audio focus). Activation can block for a noticeable time, so the
//! engine only calls these from its worker thread.

use crate::error::{BridgeError, Result};
use crate::playback::Item;

/// Platform audio session.
pub trait AudioSession: Send + Sync {
    fn activate(&self) -> Result<()>;

    fn deactivate(&self) -> Result<()>;
}

/// Session for hosts without an audio session concept.
#[derive(Debug, Clone, Default)]
pub struct NoopAudioSession;

impl AudioSession for NoopAudioSession {
    fn activate(&self) -> Result<()> {
        Ok(())
    }

    fn deactivate(&self) -> Result<()> {
        Ok(())
    }
}

/// Maps an item to the locator the media engine should load, typically
/// preferring a downloaded file over the remote URL.
///
/// Called from the playback executor; must not block.
pub trait LocatorProxy: Send + Sync {
    fn resolve(&self, item: &Item) -> Result<String>;
}

/// Proxy that loads the item's own locator.
#[derive(Debug, Clone, Default)]
pub struct DirectLocator;

impl LocatorProxy for DirectLocator {
    fn resolve(&self, item: &Item) -> Result<String> {
        if item.locator.trim().is_empty() {
            return Err(BridgeError::Unreachable(format!(
                "item {} has no locator",
                item.id
            )));
        }
        Ok(item.locator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::MediaKind;

    #[test]
    fn direct_locator_passes_through() {
        let item = Item::new("ep-1", "https://example.com/ep1.mp3", MediaKind::Audio);
        assert_eq!(
            DirectLocator.resolve(&item).unwrap(),
            "https://example.com/ep1.mp3"
        );
    }

    #[test]
    fn direct_locator_rejects_blank_locator() {
        let item = Item::new("ep-1", "  ", MediaKind::Audio);
        assert!(matches!(
            DirectLocator.resolve(&item),
            Err(BridgeError::Unreachable(_))
        ));
    }
}
