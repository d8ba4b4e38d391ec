//! Shared fixtures for manager integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::mock::MockMediaEngine;
use bridge_traits::MediaSessionId;
use core_playback::{Item, ItemId, PlaybackManager, PlayerPoolConfig};
use core_runtime::events::{CoreEvent, EventStream, PlaybackEvent};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("core_playback=debug")
        .with_test_writer()
        .try_init();
}

pub fn url(id: &str) -> String {
    format!("https://cdn.example.com/videos/{}/master.m3u8", id)
}

pub fn item(id: &str) -> Item {
    Item::new(id, url(id))
}

pub fn feed(ids: &[&str]) -> Vec<Item> {
    ids.iter().map(|id| item(id)).collect()
}

pub fn id(id: &str) -> ItemId {
    ItemId::new(id)
}

/// Let spawned work (engine preparation, observation, preload jobs) run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub async fn start(engine: &MockMediaEngine, config: PlayerPoolConfig) -> PlaybackManager {
    init_tracing();
    PlaybackManager::spawn(Arc::new(engine.clone()), config).unwrap()
}

pub async fn start_with_feed(engine: &MockMediaEngine, ids: &[&str]) -> PlaybackManager {
    let manager = start(engine, PlayerPoolConfig::default()).await;
    manager.set_feed(feed(ids)).await.unwrap();
    manager
}

/// Latest session the engine prepared for the item.
pub fn session(engine: &MockMediaEngine, item_id: &str) -> MediaSessionId {
    engine
        .latest_session(&url(item_id))
        .unwrap_or_else(|| panic!("no session prepared for {}", item_id))
}

/// Every buffered `StateChanged` for the item, in order.
pub fn drain_states(events: &mut EventStream, item_id: &str) -> Vec<String> {
    let mut states = Vec::new();
    while let Some(Ok(event)) = events.try_recv() {
        if let CoreEvent::Playback(PlaybackEvent::StateChanged { item_id: id, state }) = event {
            if id == item_id {
                states.push(state);
            }
        }
    }
    states
}

/// Every buffered event, in order.
pub fn drain(events: &mut EventStream) -> Vec<CoreEvent> {
    let mut out = Vec::new();
    while let Some(Ok(event)) = events.try_recv() {
        out.push(event);
    }
    out
}
