//! Ordered feed list supplied by the catalog.

use std::collections::HashMap;

use crate::item::{Item, ItemId};

/// Ordered, duplicate-free list of feed items.
#[derive(Debug, Clone, Default)]
pub struct FeedList {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl FeedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole feed. Later duplicates of an id are dropped.
    ///
    /// Returns the number of items kept.
    pub fn replace(&mut self, items: Vec<Item>) -> usize {
        self.items.clear();
        self.index.clear();
        self.append(items)
    }

    /// Append a page. Items whose id is already present are dropped, since
    /// consecutive pages may overlap.
    ///
    /// Returns the number of items actually added.
    pub fn append(&mut self, items: Vec<Item>) -> usize {
        let before = self.items.len();
        for item in items {
            if self.index.contains_key(&item.id) {
                continue;
            }
            self.index.insert(item.id.clone(), self.items.len());
            self.items.push(item);
        }
        self.items.len() - before
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.position(id).map(|idx| &self.items[idx])
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Number of items after `id`, or `None` when `id` is not in the feed.
    pub fn remaining_after(&self, id: &ItemId) -> Option<usize> {
        self.position(id).map(|idx| self.items.len() - idx - 1)
    }

    /// Items within `radius` positions of `id`, nearest first; at equal
    /// distance the following item comes before the preceding one.
    pub fn neighbors(&self, id: &ItemId, radius: usize) -> Vec<&Item> {
        let Some(center) = self.position(id) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(radius * 2);
        for distance in 1..=radius {
            if let Some(next) = self.items.get(center + distance) {
                out.push(next);
            }
            if let Some(prev) = center.checked_sub(distance).and_then(|i| self.items.get(i)) {
                out.push(prev);
            }
        }
        out
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| Item::new(*id, format!("https://cdn.example.com/v/{id}/master.m3u8")))
            .collect()
    }

    fn ids(list: Vec<&Item>) -> Vec<&str> {
        list.into_iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn test_append_drops_overlapping_ids() {
        let mut feed = FeedList::new();
        assert_eq!(feed.replace(items(&["a", "b", "c"])), 3);
        assert_eq!(feed.append(items(&["c", "d", "a", "e"])), 2);

        let order: Vec<&str> = feed.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(feed.position(&ItemId::new("d")), Some(3));
    }

    #[test]
    fn test_replace_resets_index() {
        let mut feed = FeedList::new();
        feed.replace(items(&["a", "b"]));
        feed.replace(items(&["x"]));

        assert!(feed.get(&ItemId::new("a")).is_none());
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_neighbors_nearest_first() {
        let mut feed = FeedList::new();
        feed.replace(items(&["a", "b", "c", "d", "e"]));

        assert_eq!(ids(feed.neighbors(&ItemId::new("c"), 1)), vec!["d", "b"]);
        assert_eq!(
            ids(feed.neighbors(&ItemId::new("c"), 2)),
            vec!["d", "b", "e", "a"]
        );
        assert_eq!(ids(feed.neighbors(&ItemId::new("a"), 1)), vec!["b"]);
        assert!(feed.neighbors(&ItemId::new("zz"), 1).is_empty());
    }

    #[test]
    fn test_remaining_after() {
        let mut feed = FeedList::new();
        feed.replace(items(&["a", "b", "c"]));

        assert_eq!(feed.remaining_after(&ItemId::new("a")), Some(2));
        assert_eq!(feed.remaining_after(&ItemId::new("c")), Some(0));
        assert_eq!(feed.remaining_after(&ItemId::new("q")), None);
    }
}
