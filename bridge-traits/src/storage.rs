//! Resume Position Storage
//!
//! The [`TimeStore`] keeps the last known playback position per item. The
//! engine only depends on its read/write contract; how entries are persisted,
//! compacted or synced is up to the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::playback::ItemId;
use crate::time::MediaTime;

/// How far an item was consumed when its timestamp was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampTag {
    Normal,
    /// Consumed to (near) completion.
    Finished,
}

/// Persisted playback position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub position: MediaTime,
    pub saved_at: DateTime<Utc>,
    pub tag: TimestampTag,
}

impl Timestamp {
    pub fn normal(position: MediaTime, saved_at: DateTime<Utc>) -> Self {
        Self {
            position,
            saved_at,
            tag: TimestampTag::Normal,
        }
    }

    pub fn finished(position: MediaTime, saved_at: DateTime<Utc>) -> Self {
        Self {
            position,
            saved_at,
            tag: TimestampTag::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.tag == TimestampTag::Finished
    }
}

/// Resume position store.
///
/// # Contract
///
/// - `time` returns `None` for items without a timestamp **and** for items
///   whose timestamp is tagged [`TimestampTag::Finished`]; finished items
///   restart from the beginning.
/// - Every method is called from the playback executor and must not block.
///   Stores backed by disk or a database should front writes with an
///   in-memory cache and persist in the background.
pub trait TimeStore: Send + Sync {
    fn time(&self, id: &ItemId) -> Option<MediaTime>;

    fn set(&self, id: &ItemId, timestamp: Timestamp);

    fn remove(&self, id: &ItemId);

    /// `true` when no timestamp of any kind exists for `id`.
    fn is_unplayed(&self, id: &ItemId) -> bool;
}
