//! # Feed Playback Example
//!
//! Drives the playback manager through a short scroll session against the
//! in-memory engine: focus, scroll, a stalled stream and its recovery.
//!
//! Run with: `cargo run --example feed_demo --package core-playback`

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::log::LogLevel;
use bridge_traits::mock::MockMediaEngine;
use bridge_traits::MediaSignal;
use core_playback::{FeedManifest, PlaybackManager, PlayerPoolConfig};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

const MANIFEST: &str = r#"{
    "videos": [
        "https://cdn.example.com/videos/intro/master.m3u8",
        "https://cdn.example.com/videos/surf/master.m3u8?token=abc",
        "https://cdn.example.com/videos/city/master.m3u8",
        "https://cdn.example.com/videos/forest/master.m3u8",
        "not a url"
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let engine = MockMediaEngine::new().with_auto_ready(true);
    let core = CoreConfig::builder()
        .media_engine(Arc::new(engine.clone()))
        .build()?;
    let manager = PlaybackManager::from_core_config(
        &core,
        PlayerPoolConfig::low_memory().with_retry_delay(Duration::from_millis(300)),
    )?;

    let mut events = manager.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("event: {}", serde_json::to_string(&event).unwrap_or_default());
        }
    });

    let items = FeedManifest::from_json(MANIFEST)?.into_items();
    println!("feed: {} playable items", items.len());
    manager.set_feed(items.clone()).await?;

    // Scroll through the feed.
    for item in &items {
        manager.notify_focus(item.id.clone()).await?;
        tokio::time::sleep(Duration::from_millis(700)).await;
        println!(
            "{} -> {} (last position {:?})",
            item.id,
            manager.current_state(&item.id),
            manager.last_position(item.id.clone()).await?
        );
    }

    // Simulate a network stall on the focused stream.
    if let Some(last) = items.last() {
        if let Some(session) = engine.latest_session(&last.source.url) {
            engine.emit(
                session,
                MediaSignal::FailedToPlayToEnd {
                    message: "connection reset".to_string(),
                },
            );
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!(
            "{} -> {} ({:?})",
            last.id,
            manager.current_state(&last.id),
            manager.current_error(&last.id)
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        println!("{} -> {} after recovery", last.id, manager.current_state(&last.id));
    }

    println!("pool: {:?}", manager.snapshot().await?);
    manager.shutdown().await?;
    Ok(())
}
