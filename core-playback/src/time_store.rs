//! # In-Memory Time Store
//!
//! [`TimeStore`] implementation backed by a `HashMap`. Suitable for tests,
//! ephemeral sessions, and as the memory front of a persistent store: hosts
//! can snapshot it with [`MemoryTimeStore::to_json`] and restore it with
//! [`MemoryTimeStore::from_json`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bridge_traits::{ItemId, MediaTime, TimeStore, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Entry {
    id: ItemId,
    #[serde(flatten)]
    timestamp: Timestamp,
}

/// Thread-safe in-memory resume position store.
#[derive(Default, Clone)]
pub struct MemoryTimeStore {
    entries: Arc<RwLock<HashMap<ItemId, Timestamp>>>,
}

impl MemoryTimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full timestamp for `id`, including finished ones.
    pub fn timestamp(&self, id: &ItemId) -> Option<Timestamp> {
        self.entries.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Serializes every entry, ordered by item id.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut entries: Vec<Entry> = self
            .entries
            .read()
            .iter()
            .map(|(id, timestamp)| Entry {
                id: id.clone(),
                timestamp: timestamp.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        serde_json::to_string(&entries)
    }

    /// Restores a store from [`to_json`](Self::to_json) output. Later
    /// duplicates of an id replace earlier ones.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let entries: Vec<Entry> = serde_json::from_str(json)?;
        let map = entries
            .into_iter()
            .map(|entry| (entry.id, entry.timestamp))
            .collect();
        Ok(Self {
            entries: Arc::new(RwLock::new(map)),
        })
    }
}

impl TimeStore for MemoryTimeStore {
    fn time(&self, id: &ItemId) -> Option<MediaTime> {
        self.entries
            .read()
            .get(id)
            .filter(|timestamp| !timestamp.is_finished())
            .map(|timestamp| timestamp.position)
    }

    fn set(&self, id: &ItemId, timestamp: Timestamp) {
        self.entries.write().insert(id.clone(), timestamp);
    }

    fn remove(&self, id: &ItemId) {
        self.entries.write().remove(id);
    }

    fn is_unplayed(&self, id: &ItemId) -> bool {
        !self.entries.read().contains_key(id)
    }
}

impl fmt::Debug for MemoryTimeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTimeStore")
            .field("entries", &self.len())
            .finish()
    }
}
