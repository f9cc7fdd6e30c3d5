//! URL → entry mapping consulted by every request.
//!
//! # Design Decisions
//! - The whole map sits behind an `ArcSwap`; writers publish a new map, readers
//!   never block and never see a half-built entry
//! - Entries are `Arc`s, so a request keeps the version it looked up even if a
//!   reload lands mid-response
//! - One writer per URL (its reload task), so copy-on-write contention is rare

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::assets::entry::AssetEntry;
use crate::assets::CATCH_ALL_URL;

type EntryMap = HashMap<String, Arc<AssetEntry>>;

/// Shared handle to the current set of entries. Cloning shares the same table.
#[derive(Clone, Default)]
pub struct AssetTable {
    inner: Arc<ArcSwap<EntryMap>>,
}

impl AssetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry registered for exactly `url`.
    pub fn get(&self, url: &str) -> Option<Arc<AssetEntry>> {
        self.inner.load().get(url).cloned()
    }

    /// The entry answering a request for `path`, falling back to the catch-all.
    pub fn resolve(&self, path: &str) -> Option<Arc<AssetEntry>> {
        let map = self.inner.load();
        map.get(path).or_else(|| map.get(CATCH_ALL_URL)).cloned()
    }

    /// Publish `entry`, replacing whatever its URL mapped to.
    ///
    /// `loaded_at` is bumped past the previous version's if the clock has not
    /// moved forward, so the modification validator never goes backwards.
    pub fn install(&self, entry: AssetEntry) {
        self.inner.rcu(|current| {
            let mut entry = entry.clone();
            if let Some(previous) = current.get(&entry.url) {
                if entry.loaded_at <= previous.loaded_at {
                    entry.loaded_at = previous.loaded_at + Duration::from_millis(1);
                }
            }
            let mut next = EntryMap::clone(current);
            next.insert(entry.url.clone(), Arc::new(entry));
            next
        });
    }

    /// Drop the entry for `url`.
    pub fn remove(&self, url: &str) -> Option<Arc<AssetEntry>> {
        let previous = self.inner.rcu(|current| {
            let mut next = EntryMap::clone(current);
            next.remove(url);
            next
        });
        previous.get(url).cloned()
    }

    /// Registered URLs, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.inner.load().keys().cloned().collect();
        urls.sort();
        urls
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl std::fmt::Debug for AssetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTable").field("urls", &self.urls()).finish()
    }
}
