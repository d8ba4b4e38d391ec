//! Bounded pool of promoted handles.

use lru::LruCache;

use crate::handle::{HandleId, PlaybackHandle};
use crate::item::ItemId;

/// Handles currently eligible for playback commands, in insertion order.
///
/// Backed by an unbounded [`LruCache`] that is only ever touched through
/// `push`/`peek`/`pop`, so its recency order is insertion order. The bound is
/// enforced by [`ActivePool::overflow`] plus the caller's eviction, not by the
/// cache itself: evicting a handle needs async work (persist position, pause,
/// release) that the cache cannot do.
pub(crate) struct ActivePool {
    entries: LruCache<ItemId, PlaybackHandle>,
    capacity: usize,
}

impl ActivePool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains(id)
    }

    pub(crate) fn get(&self, id: &ItemId) -> Option<&PlaybackHandle> {
        self.entries.peek(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ItemId) -> Option<&mut PlaybackHandle> {
        self.entries.peek_mut(id)
    }

    /// The item's handle, only if it is the instance `handle_id`.
    pub(crate) fn current_mut(
        &mut self,
        id: &ItemId,
        handle_id: HandleId,
    ) -> Option<&mut PlaybackHandle> {
        self.entries
            .peek_mut(id)
            .filter(|handle| handle.id() == handle_id)
    }

    pub(crate) fn is_current(&self, id: &ItemId, handle_id: HandleId) -> bool {
        self.entries
            .peek(id)
            .map_or(false, |handle| handle.id() == handle_id)
    }

    /// Register a handle as the newest entry. Returns the handle it displaced.
    pub(crate) fn insert(&mut self, handle: PlaybackHandle) -> Option<PlaybackHandle> {
        let id = handle.item_id().clone();
        self.entries.push(id, handle).map(|(_, old)| old)
    }

    pub(crate) fn remove(&mut self, id: &ItemId) -> Option<PlaybackHandle> {
        self.entries.pop(id)
    }

    /// Oldest entries to evict so the pool fits its capacity again, never
    /// including `except`.
    pub(crate) fn overflow(&self, except: Option<&ItemId>) -> Vec<ItemId> {
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return Vec::new();
        }

        self.entries
            .iter()
            .rev()
            .map(|(id, _)| id)
            .filter(|id| Some(*id) != except)
            .take(excess)
            .cloned()
            .collect()
    }

    pub(crate) fn ids_oldest_first(&self) -> Vec<ItemId> {
        self.entries.iter().rev().map(|(id, _)| id.clone()).collect()
    }

    /// Remove every handle, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<PlaybackHandle> {
        let mut out = Vec::with_capacity(self.entries.len());
        while let Some((_, handle)) = self.entries.pop_lru() {
            out.push(handle);
        }
        out
    }
}
