//! # Event Bus System
//!
//! Broadcasts what the feed playback core is doing to anyone who cares: the UI
//! layer, diagnostics overlays, the catalog fetcher waiting for the end of the
//! feed. Built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps one enum per domain (playback, feed, app lifecycle)
//! - **EventBus**: Cloneable sender side; every clone publishes into the same channel
//! - **EventStream**: Receiver wrapper with an optional predicate
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐  subscribe  ┌──────────────┐
//! │ Playback manager ├──────────>│           ├────────────>│ UI overlay   │
//! └──────────────────┘           │ EventBus  │             └──────────────┘
//!                                │ (broadcast│
//! ┌──────────────────┐   emit    │  channel) │  subscribe  ┌──────────────┐
//! │ Lifecycle wiring ├──────────>│           ├────────────>│ Feed fetcher │
//! └──────────────────┘           └───────────┘             └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, FeedEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Feed(FeedEvent::EndApproaching { remaining: 2 })).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Feed(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! `emit` fails when nobody is subscribed. Publishers inside the core ignore
//! that error: events are advisory and nothing waits on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// State changes arrive in bursts while the user flings through the feed;
/// subscribers that fall further behind get `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Per-item playback and pool activity
    Playback(PlaybackEvent),
    /// Feed list changes
    Feed(FeedEvent),
    /// Reactions to host lifecycle signals
    Lifecycle(LifecycleEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Feed(e) => e.description(),
            CoreEvent::Lifecycle(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Failed {
                recoverable: false, ..
            }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Failed { .. })
            | CoreEvent::Playback(PlaybackEvent::RecoveryScheduled { .. })
            | CoreEvent::Lifecycle(LifecycleEvent::MemoryFlushed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::FocusChanged { .. })
            | CoreEvent::Feed(FeedEvent::EndApproaching { .. })
            | CoreEvent::Lifecycle(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Item the event concerns, if it concerns exactly one.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(e) => e.item_id(),
            _ => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback resource manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The focused item changed.
    FocusChanged {
        item_id: String,
        previous: Option<String>,
    },
    /// An item's playback state changed.
    StateChanged {
        item_id: String,
        /// Lowercase state name (`loading`, `ready`, `playing`, `paused`, `failed`).
        state: String,
    },
    /// An item entered the failed state.
    Failed {
        item_id: String,
        /// Failure kind (`construction`, `playback`, `stall`).
        kind: String,
        message: String,
        /// Whether the manager retries this kind of failure on its own.
        recoverable: bool,
    },
    /// A recreate-and-retry was scheduled for an item.
    RecoveryScheduled { item_id: String, delay_ms: u64 },
    /// A replacement handle was created for a failed item.
    RecoveryStarted { item_id: String },
    /// A handle was warmed and parked in the preload pool.
    Preloaded { item_id: String },
    /// An active handle was released to keep the pool bounded.
    Evicted {
        item_id: String,
        /// Position persisted for the item at eviction time (milliseconds).
        position_ms: u64,
    },
    /// An item left the retention window and lost all of its resources.
    CleanedUp { item_id: String },
    /// The focused item reached its end and restarted.
    Looped { item_id: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::FocusChanged { .. } => "Focused item changed",
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::Failed { .. } => "Item playback failed",
            PlaybackEvent::RecoveryScheduled { .. } => "Recovery scheduled",
            PlaybackEvent::RecoveryStarted { .. } => "Recovery started",
            PlaybackEvent::Preloaded { .. } => "Item preloaded",
            PlaybackEvent::Evicted { .. } => "Active player evicted",
            PlaybackEvent::CleanedUp { .. } => "Item resources cleaned up",
            PlaybackEvent::Looped { .. } => "Item looped",
        }
    }

    fn item_id(&self) -> Option<&str> {
        match self {
            PlaybackEvent::FocusChanged { item_id, .. }
            | PlaybackEvent::StateChanged { item_id, .. }
            | PlaybackEvent::Failed { item_id, .. }
            | PlaybackEvent::RecoveryScheduled { item_id, .. }
            | PlaybackEvent::RecoveryStarted { item_id }
            | PlaybackEvent::Preloaded { item_id }
            | PlaybackEvent::Evicted { item_id, .. }
            | PlaybackEvent::CleanedUp { item_id }
            | PlaybackEvent::Looped { item_id } => Some(item_id),
        }
    }
}

// ============================================================================
// Feed Events
// ============================================================================

/// Events about the ordered feed list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FeedEvent {
    /// Items were set or appended.
    Updated {
        /// Items in the feed after the update.
        total: usize,
        /// Items that were not already present.
        added: usize,
    },
    /// The focused item is close to the end of the feed; time to fetch the next page.
    EndApproaching {
        /// Items after the focused one.
        remaining: usize,
    },
}

impl FeedEvent {
    fn description(&self) -> &str {
        match self {
            FeedEvent::Updated { .. } => "Feed updated",
            FeedEvent::EndApproaching { .. } => "Feed end approaching",
        }
    }
}

// ============================================================================
// Lifecycle Events
// ============================================================================

/// How the core reacted to a host lifecycle signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// Every player was paused because the app left the foreground.
    Backgrounded { paused: usize },
    /// The app came back; the focused item (if any) was resumed.
    Foregrounded { resumed: Option<String> },
    /// Memory pressure dropped every player and all per-item records.
    MemoryFlushed { released: usize },
}

impl LifecycleEvent {
    fn description(&self) -> &str {
        match self {
            LifecycleEvent::Backgrounded { .. } => "Players paused for background",
            LifecycleEvent::Foregrounded { .. } => "Playback resumed for foreground",
            LifecycleEvent::MemoryFlushed { .. } => "Players flushed under memory pressure",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with [`DEFAULT_EVENT_BUFFER_SIZE`].
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(64);
/// let item_a = EventStream::new(bus.subscribe())
///     .filter(|event| event.item_id() == Some("a1"));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield events matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state_changed(item: &str, state: &str) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::StateChanged {
            item_id: item.to_string(),
            state: state.to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(state_changed("a1", "loading")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Playback(PlaybackEvent::Preloaded {
            item_id: "b2".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| event.item_id() == Some("a1"));

        bus.emit(state_changed("b2", "ready")).ok();
        bus.emit(CoreEvent::Feed(FeedEvent::Updated { total: 3, added: 3 }))
            .ok();
        bus.emit(state_changed("a1", "playing")).ok();

        assert_eq!(stream.recv().await.unwrap(), state_changed("a1", "playing"));
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(state_changed(&format!("item-{i}"), "loading")).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let fatal = CoreEvent::Playback(PlaybackEvent::Failed {
            item_id: "a1".to_string(),
            kind: "playback".to_string(),
            message: "decoder error".to_string(),
            recoverable: false,
        });
        assert_eq!(fatal.severity(), EventSeverity::Error);

        let retried = CoreEvent::Playback(PlaybackEvent::RecoveryScheduled {
            item_id: "a1".to_string(),
            delay_ms: 1000,
        });
        assert_eq!(retried.severity(), EventSeverity::Warning);

        let flush = CoreEvent::Lifecycle(LifecycleEvent::MemoryFlushed { released: 4 });
        assert_eq!(flush.severity(), EventSeverity::Warning);

        let end = CoreEvent::Feed(FeedEvent::EndApproaching { remaining: 1 });
        assert_eq!(end.severity(), EventSeverity::Info);

        assert_eq!(state_changed("a1", "ready").severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Playback(PlaybackEvent::Evicted {
            item_id: "a1".to_string(),
            position_ms: 4200,
        });
        assert_eq!(event.description(), "Active player evicted");
        assert_eq!(event.item_id(), Some("a1"));
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(state_changed(&format!("item-{i}"), "ready")).ok();
            }
        });
        let handle2 = tokio::spawn(async move {
            for i in 0..10 {
                bus2.emit(CoreEvent::Feed(FeedEvent::Updated {
                    total: i,
                    added: 1,
                }))
                .ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Playback(PlaybackEvent::Failed {
            item_id: "c3".to_string(),
            kind: "stall".to_string(),
            message: "connection reset".to_string(),
            recoverable: true,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Playback\""));
        assert!(json.contains("\"event\":\"Failed\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        let event = CoreEvent::Lifecycle(LifecycleEvent::Foregrounded {
            resumed: Some("a1".to_string()),
        });
        bus.emit(event.clone()).ok();

        assert_eq!(stream.try_recv().unwrap().unwrap(), event);
    }
}
