//! Per-item playback state, failure records and the position ledger.
//!
//! The [`StateStore`] is written only by the manager task. It sits behind a
//! read-write lock so the UI can query state without a round trip through the
//! manager's command channel.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bridge_traits::MediaSource;
use serde::{Deserialize, Serialize};

use crate::error::ItemFailure;
use crate::item::ItemId;

/// Observable playback state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// A player exists (or is being created) but cannot render yet.
    /// Also reported for items the manager knows nothing about.
    #[default]
    Loading,
    /// The player can start rendering.
    Ready,
    /// The player broke; see the item's failure record.
    Failed,
    /// Rendering.
    Playing,
    /// Paused by the manager or the app.
    Paused,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Failed => "failed",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        }
    }

    /// Returns `true` if the player can be told to play.
    pub fn can_play(&self) -> bool {
        matches!(self, PlaybackState::Ready | PlaybackState::Paused)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State, failure and source records keyed by item id.
#[derive(Debug, Default)]
pub struct StateStore {
    states: HashMap<ItemId, PlaybackState>,
    errors: HashMap<ItemId, ItemFailure>,
    sources: HashMap<ItemId, MediaSource>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the item, `Loading` when unknown.
    pub fn state(&self, id: &ItemId) -> PlaybackState {
        self.states.get(id).copied().unwrap_or_default()
    }

    /// State of the item, `None` when there is no entry.
    pub fn entry(&self, id: &ItemId) -> Option<PlaybackState> {
        self.states.get(id).copied()
    }

    /// Set the state. Returns `true` if it changed.
    pub fn set_state(&mut self, id: &ItemId, state: PlaybackState) -> bool {
        self.states.insert(id.clone(), state) != Some(state)
    }

    pub fn error(&self, id: &ItemId) -> Option<&ItemFailure> {
        self.errors.get(id)
    }

    pub fn record_failure(&mut self, id: &ItemId, failure: ItemFailure) {
        self.errors.insert(id.clone(), failure);
    }

    pub fn clear_error(&mut self, id: &ItemId) {
        self.errors.remove(id);
    }

    pub fn source(&self, id: &ItemId) -> Option<&MediaSource> {
        self.sources.get(id)
    }

    pub fn record_source(&mut self, id: &ItemId, source: MediaSource) {
        self.sources.insert(id.clone(), source);
    }

    /// Drop every record of the item.
    pub fn forget(&mut self, id: &ItemId) {
        self.states.remove(id);
        self.errors.remove(id);
        self.sources.remove(id);
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.errors.clear();
        self.sources.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Last observed playback position per item, independent of player lifetime.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: HashMap<ItemId, Duration>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: &ItemId, position: Duration) {
        self.positions.insert(id.clone(), position);
    }

    pub fn get(&self, id: &ItemId) -> Option<Duration> {
        self.positions.get(id).copied()
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Duration> {
        self.positions.remove(id)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
