//! Integration tests for failure handling and delayed recovery.

mod common;

use std::time::Duration;

use bridge_traits::mock::MockMediaEngine;
use bridge_traits::MediaSignal;
use common::*;
use core_playback::{FailureKind, ItemFailure, PlaybackState, PlayerPoolConfig};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent};

async fn focused_and_playing(engine: &MockMediaEngine, ids: &[&str]) -> core_playback::PlaybackManager {
    let manager = start_with_feed(engine, ids).await;
    manager.notify_focus(ids[0]).await.unwrap();
    settle().await;
    engine.emit(session(engine, ids[0]), MediaSignal::ReadyToPlay);
    settle().await;
    assert_eq!(manager.current_state(&id(ids[0])), PlaybackState::Playing);
    manager
}

#[tokio::test(start_paused = true)]
async fn test_focused_stall_recovers_after_delay() {
    let engine = MockMediaEngine::new();
    let manager = focused_and_playing(&engine, &["a", "b"]).await;
    let first = session(&engine, "a");
    engine.set_position(first, Duration::from_millis(2500));

    engine.emit(
        first,
        MediaSignal::FailedToPlayToEnd {
            message: "connection reset".into(),
        },
    );
    settle().await;

    assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);
    assert_eq!(
        manager.current_error(&id("a")),
        Some(ItemFailure::Stall("connection reset".into()))
    );
    assert!(engine.is_released(first));
    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.pending_retries, vec![id("a")]);
    assert!(!snapshot.active.contains(&id("a")));

    // Still failed just before the delay elapses.
    tokio::time::sleep(Duration::from_millis(970)).await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);
    assert_eq!(engine.prepare_count(&url("a")), 1);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Loading);
    assert_eq!(engine.prepare_count(&url("a")), 2);

    let second = session(&engine, "a");
    assert_ne!(first, second);
    assert!(!engine.is_released(second));
    assert_eq!(engine.seeks_of(second), vec![Duration::from_millis(2500)]);

    engine.emit(second, MediaSignal::ReadyToPlay);
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);
    assert!(manager.current_error(&id("a")).is_none());
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_failure_is_retried_once() {
    let engine = MockMediaEngine::new();
    let manager = start_with_feed(&engine, &["a"]).await;
    let mut events = manager.subscribe_events().filter(|event| {
        matches!(
            event,
            CoreEvent::Playback(PlaybackEvent::RecoveryScheduled { .. })
                | CoreEvent::Playback(PlaybackEvent::RecoveryStarted { .. })
        )
    });

    engine.fail_prepare_for(url("a"));
    manager.notify_focus("a").await.unwrap();
    settle().await;
    assert_eq!(
        manager.current_error(&id("a")).map(|failure| failure.kind()),
        Some(FailureKind::Construction)
    );

    // Each recreated player fails again and earns exactly one more retry.
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(1010)).await;
        assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);
        assert_eq!(manager.snapshot().await.unwrap().pending_retries, vec![id("a")]);
    }

    let recoveries = drain(&mut events);
    let scheduled = recoveries
        .iter()
        .filter(|event| matches!(event, CoreEvent::Playback(PlaybackEvent::RecoveryScheduled { .. })))
        .count();
    let started = recoveries.len() - scheduled;
    assert_eq!(scheduled, 4);
    assert_eq!(started, 3);

    engine.clear_prepare_failure(&url("a"));
    tokio::time::sleep(Duration::from_millis(1010)).await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Loading);
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_playback_failure_is_not_retried_automatically() {
    let engine = MockMediaEngine::new();
    let manager = focused_and_playing(&engine, &["a"]).await;
    let first = session(&engine, "a");

    engine.emit(
        first,
        MediaSignal::Failed {
            message: "decoder error".into(),
        },
    );
    settle().await;

    assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);
    assert_eq!(
        manager.current_error(&id("a")),
        Some(ItemFailure::Playback("decoder error".into()))
    );
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.prepare_count(&url("a")), 1);

    // Resume never revives a failed item.
    manager.resume("a").await.unwrap();
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);

    // A user retry does, immediately.
    manager.retry("a").await.unwrap();
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Loading);
    settle().await;
    assert_eq!(engine.prepare_count(&url("a")), 2);
    assert!(engine.is_released(first));
}

#[tokio::test(start_paused = true)]
async fn test_unfocused_failure_waits_for_focus() {
    let engine = MockMediaEngine::new();
    let manager = start_with_feed(&engine, &["a", "b"]).await;

    engine.fail_prepare_for(url("b"));
    let binding = manager.acquire_handle(item("b")).await.unwrap();
    assert!(binding.session.is_none());
    assert_eq!(manager.current_state(&id("b")), PlaybackState::Failed);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());
    assert_eq!(engine.prepare_count(&url("b")), 0);

    engine.clear_prepare_failure(&url("b"));
    manager.notify_focus("b").await.unwrap();
    assert_eq!(manager.current_state(&id("b")), PlaybackState::Loading);
    settle().await;
    assert_eq!(engine.prepare_count(&url("b")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_cancels_pending_retry() {
    let engine = MockMediaEngine::new();
    let manager = focused_and_playing(&engine, &["a", "b"]).await;

    engine.emit(
        session(&engine, "a"),
        MediaSignal::FailedToPlayToEnd {
            message: "stalled".into(),
        },
    );
    settle().await;
    assert_eq!(manager.snapshot().await.unwrap().pending_retries, vec![id("a")]);

    manager.notify_focus("b").await.unwrap();
    manager.notify_left_retention_window("a").await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    // Focusing B queued a warm-up of A; cleanup must cancel that too.
    assert!(engine
        .sessions_for(&url("a"))
        .into_iter()
        .all(|session| engine.is_released(session)));
    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.pending_retries.is_empty());
    assert!(!snapshot.preloaded.contains(&id("a")));
    assert!(!snapshot.active.contains(&id("a")));
    assert!(manager.current_error(&id("a")).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_refocus_recreates_without_waiting() {
    let engine = MockMediaEngine::new();
    let manager = focused_and_playing(&engine, &["a", "b"]).await;

    engine.emit(
        session(&engine, "a"),
        MediaSignal::FailedToPlayToEnd {
            message: "stalled".into(),
        },
    );
    settle().await;

    manager.notify_focus("a").await.unwrap();
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Loading);
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(engine.prepare_count(&url("a")), 2);
}

#[tokio::test(start_paused = true)]
async fn test_surface_acquire_supersedes_pending_retry() {
    let engine = MockMediaEngine::new();
    let manager = focused_and_playing(&engine, &["a", "b"]).await;

    engine.emit(
        session(&engine, "a"),
        MediaSignal::FailedToPlayToEnd {
            message: "stalled".into(),
        },
    );
    settle().await;
    assert_eq!(manager.snapshot().await.unwrap().pending_retries, vec![id("a")]);

    // The surface asks for a player again before the retry fires.
    let binding = manager.acquire_handle(item("a")).await.unwrap();
    let bound = binding.session.expect("session allocated");
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());

    engine.emit(bound, MediaSignal::ReadyToPlay);
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(!engine.is_released(bound));
    assert!(engine.is_playing(bound));
    assert_eq!(engine.prepare_count(&url("a")), 2);
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_auto_recovery_can_be_disabled() {
    init_tracing();
    let engine = MockMediaEngine::new();
    let core = CoreConfig::builder()
        .media_engine(std::sync::Arc::new(engine.clone()))
        .enable_auto_recovery(false)
        .build()
        .unwrap();
    let manager =
        core_playback::PlaybackManager::from_core_config(&core, PlayerPoolConfig::default())
            .unwrap();
    manager.set_feed(feed(&["a"])).await.unwrap();

    engine.fail_prepare_for(url("a"));
    manager.notify_focus("a").await.unwrap();
    settle().await;
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(manager.snapshot().await.unwrap().pending_retries.is_empty());
    assert_eq!(manager.current_state(&id("a")), PlaybackState::Failed);
}
