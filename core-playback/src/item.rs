//! Feed items and the manifest they are decoded from.

use std::fmt;

use bridge_traits::MediaSource;
use serde::{Deserialize, Serialize};
use url::Url;

/// Stable identifier of a feed item.
///
/// Used as the cache key for every per-item record, so it must not change
/// between fetches of the same item.
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

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One playable unit of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub source: MediaSource,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: MediaSource::new(source_url),
        }
    }

    /// Build an item from a stream URL, taking the id from the directory that
    /// holds the playlist: `https://host/videos/<id>/master.m3u8`.
    ///
    /// Returns `None` when the URL does not parse or has fewer than two path
    /// segments.
    pub fn from_source_url(source_url: &str) -> Option<Self> {
        let url = Url::parse(source_url).ok()?;
        let segments: Vec<&str> = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.len() < 2 {
            return None;
        }

        let id = segments[segments.len() - 2];
        Some(Self::new(id, source_url))
    }
}

/// Manifest served by the catalog: an ordered list of stream URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedManifest {
    pub videos: Vec<String>,
}

impl FeedManifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Items in manifest order. URLs that do not yield an id are skipped.
    pub fn into_items(self) -> Vec<Item> {
        self.videos
            .iter()
            .filter_map(|url| {
                let item = Item::from_source_url(url);
                if item.is_none() {
                    tracing::debug!(url = %core_runtime::logging::redact_url(url), "Skipping manifest entry without item id");
                }
                item
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_second_to_last_segment() {
        let item =
            Item::from_source_url("https://cdn.example.com/videos/7f3a9c/master.m3u8?sig=1")
                .unwrap();
        assert_eq!(item.id.as_str(), "7f3a9c");
        assert!(item.source.url.ends_with("master.m3u8?sig=1"));
    }

    #[test]
    fn test_rejects_short_or_invalid_urls() {
        assert!(Item::from_source_url("https://cdn.example.com/master.m3u8").is_none());
        assert!(Item::from_source_url("not a url").is_none());
    }

    #[test]
    fn test_manifest_decoding_skips_bad_entries() {
        let manifest = FeedManifest::from_json(
            r#"{ "videos": [
                "https://cdn.example.com/v/a1/master.m3u8",
                "https://cdn.example.com/master.m3u8",
                "https://cdn.example.com/v/b2/master.m3u8"
            ] }"#,
        )
        .unwrap();

        let ids: Vec<String> = manifest
            .into_items()
            .into_iter()
            .map(|item| item.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a1", "b2"]);
    }
}
