//! Integration tests for host lifecycle handling and memory pressure.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::mock::{MockLifecycleObserver, MockMediaEngine};
use bridge_traits::LifecycleEvent;
use common::*;
use core_playback::{PlaybackManager, PlaybackState, PlayerPoolConfig};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, LifecycleEvent as LifecycleReaction};

#[tokio::test(start_paused = true)]
async fn test_background_pauses_everything_and_foreground_resumes_focus() {
    let engine = MockMediaEngine::new().with_auto_ready(true);
    let manager = start_with_feed(&engine, &["a", "b"]).await;

    manager.notify_focus("a").await.unwrap();
    settle().await;
    let a = session(&engine, "a");
    let b = session(&engine, "b");
    engine.set_position(a, Duration::from_secs(3));

    manager.notify_background().await.unwrap();
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Paused);
    assert!(!engine.is_playing(a));
    assert!(!engine.is_playing(b));
    assert_eq!(
        manager.last_position("a").await.unwrap(),
        Some(Duration::from_secs(3))
    );

    // Nothing is evicted or released while in the background.
    let snapshot = manager.snapshot().await.unwrap();
    assert!(!snapshot.foreground);
    assert_eq!(snapshot.active, vec![id("a")]);
    assert_eq!(snapshot.preloaded, vec![id("b")]);
    assert_eq!(engine.live_sessions(), 2);

    manager.notify_foreground().await.unwrap();
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);
    assert!(engine.is_playing(a));
    assert!(!engine.is_playing(b));
}

#[tokio::test(start_paused = true)]
async fn test_item_ready_in_background_waits_for_foreground() {
    let engine = MockMediaEngine::new();
    let manager = start_with_feed(&engine, &["a"]).await;

    manager.notify_focus("a").await.unwrap();
    settle().await;
    manager.notify_background().await.unwrap();

    let a = session(&engine, "a");
    engine.emit(a, bridge_traits::MediaSignal::ReadyToPlay);
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Ready);
    assert!(!engine.is_playing(a));

    manager.notify_foreground().await.unwrap();
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);
    assert!(engine.is_playing(a));
}

#[tokio::test(start_paused = true)]
async fn test_memory_pressure_flushes_everything() {
    let engine = MockMediaEngine::new().with_auto_ready(true);
    let manager = start_with_feed(&engine, &["a", "b", "c"]).await;
    let mut events = manager.subscribe_events().filter(|event| {
        matches!(event, CoreEvent::Lifecycle(LifecycleReaction::MemoryFlushed { .. }))
    });

    manager.notify_focus("a").await.unwrap();
    settle().await;
    manager.notify_focus("b").await.unwrap();
    settle().await;
    assert_eq!(engine.live_sessions(), 3);

    manager.notify_memory_pressure().await.unwrap();
    settle().await;

    for item_id in ["a", "b", "c"] {
        assert_eq!(manager.current_state(&id(item_id)), PlaybackState::Loading);
        assert!(manager.current_error(&id(item_id)).is_none());
        assert_eq!(manager.last_position(item_id).await.unwrap(), None);
    }
    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.active.is_empty());
    assert!(snapshot.preloaded.is_empty());
    assert_eq!(snapshot.focused, None);
    assert_eq!(snapshot.ledger_entries, 0);
    assert_eq!(engine.live_sessions(), 0);
    assert_eq!(
        drain(&mut events),
        vec![CoreEvent::Lifecycle(LifecycleReaction::MemoryFlushed {
            released: 3
        })]
    );

    // The feed survives; focusing again starts from scratch.
    manager.notify_focus("a").await.unwrap();
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);
    assert_eq!(engine.prepare_count(&url("a")), 2);
}

#[tokio::test(start_paused = true)]
async fn test_memory_pressure_cancels_pending_retries() {
    let engine = MockMediaEngine::new();
    let manager = start_with_feed(&engine, &["a"]).await;

    engine.fail_prepare_for(url("a"));
    manager.notify_focus("a").await.unwrap();
    settle().await;
    assert_eq!(manager.snapshot().await.unwrap().pending_retries, vec![id("a")]);

    manager.notify_memory_pressure().await.unwrap();
    engine.clear_prepare_failure(&url("a"));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(engine.prepare_count(&url("a")), 0);
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_observer_events_reach_the_manager() {
    init_tracing();
    let engine = MockMediaEngine::new().with_auto_ready(true);
    let observer = MockLifecycleObserver::new();
    let core = CoreConfig::builder()
        .media_engine(Arc::new(engine.clone()))
        .lifecycle_observer(Arc::new(observer.clone()))
        .enable_lifecycle_handling(true)
        .build()
        .unwrap();
    let manager = PlaybackManager::from_core_config(&core, PlayerPoolConfig::default()).unwrap();
    manager.set_feed(feed(&["a", "b"])).await.unwrap();
    settle().await;
    assert_eq!(observer.subscriber_count(), 1);

    manager.notify_focus("a").await.unwrap();
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);

    observer.emit(LifecycleEvent::Suspended);
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Paused);

    observer.emit(LifecycleEvent::EnteredForeground);
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);

    observer.emit(LifecycleEvent::MemoryWarning);
    settle().await;
    assert!(manager.snapshot().await.unwrap().active.is_empty());
    assert_eq!(engine.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_manager_started_in_background_does_not_autoplay() {
    init_tracing();
    let engine = MockMediaEngine::new().with_auto_ready(true);
    let observer = MockLifecycleObserver::new();
    observer.emit(LifecycleEvent::EnteredBackground);

    let manager = start(&engine, PlayerPoolConfig::default()).await;
    manager.attach_lifecycle_observer(Arc::new(observer.clone()));
    manager.set_feed(feed(&["a"])).await.unwrap();
    settle().await;

    manager.notify_focus("a").await.unwrap();
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Ready);
    assert!(!manager.snapshot().await.unwrap().foreground);
}
