//! In-memory bridge implementations for tests and demos.
//!
//! [`MockMediaEngine`] behaves like a native player without decoding anything:
//! sessions are plain records, transport commands mutate them, and the test
//! decides when a session becomes ready or fails by calling [`MockMediaEngine::emit`].
//! [`MockLifecycleObserver`] lets a test play the host's role for app
//! lifecycle transitions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{BridgeError, Result};
use crate::lifecycle::{LifecycleEvent, LifecycleEventStream, LifecycleObserver, LifecycleState};
use crate::media::{
    MediaEngine, MediaRequest, MediaSessionId, MediaSignal, MediaSignalStream, MediaSource,
};

// ============================================================================
// Media engine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Failed,
}

struct SessionRecord {
    source: MediaSource,
    readiness: Readiness,
    failure: Option<String>,
    playing: bool,
    position: Duration,
    seeks: Vec<Duration>,
    play_calls: usize,
    released: bool,
    subscribers: Vec<mpsc::UnboundedSender<MediaSignal>>,
}

impl SessionRecord {
    fn broadcast(&mut self, signal: &MediaSignal) {
        self.subscribers
            .retain(|subscriber| subscriber.send(signal.clone()).is_ok());
    }
}

#[derive(Default)]
struct EngineState {
    sessions: HashMap<MediaSessionId, SessionRecord>,
    prepared: Vec<MediaSessionId>,
    failing_sources: HashSet<String>,
    auto_ready: bool,
}

impl EngineState {
    fn live(&mut self, session: MediaSessionId) -> Result<&mut SessionRecord> {
        match self.sessions.get_mut(&session) {
            Some(record) if !record.released => Ok(record),
            _ => Err(BridgeError::SessionNotFound(session)),
        }
    }
}

/// Scriptable media engine.
///
/// Cloning is cheap; clones share the same sessions.
#[derive(Clone, Default)]
pub struct MockMediaEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MockMediaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every new session report `ReadyToPlay` as soon as it is prepared.
    pub fn with_auto_ready(self, enabled: bool) -> Self {
        self.state.lock().auto_ready = enabled;
        self
    }

    /// Make `prepare` fail for the given source URL.
    pub fn fail_prepare_for(&self, url: impl Into<String>) {
        self.state.lock().failing_sources.insert(url.into());
    }

    /// Let `prepare` succeed again for the given source URL.
    pub fn clear_prepare_failure(&self, url: &str) {
        self.state.lock().failing_sources.remove(url);
    }

    /// Deliver a signal to every subscriber of the session.
    ///
    /// `ReadyToPlay` and `Failed` are remembered and replayed to later
    /// subscribers. Signals for released sessions are dropped.
    pub fn emit(&self, session: MediaSessionId, signal: MediaSignal) {
        let mut state = self.state.lock();
        let Some(record) = state.sessions.get_mut(&session) else {
            return;
        };
        if record.released {
            return;
        }
        match &signal {
            MediaSignal::ReadyToPlay => {
                record.readiness = Readiness::Ready;
                record.failure = None;
            }
            MediaSignal::Failed { message } => {
                record.readiness = Readiness::Failed;
                record.failure = Some(message.clone());
                record.playing = false;
            }
            MediaSignal::FailedToPlayToEnd { .. } => record.playing = false,
            MediaSignal::PlayedToEnd | MediaSignal::Stalled => {}
        }
        record.broadcast(&signal);
    }

    /// Every session prepared for the URL, oldest first.
    pub fn sessions_for(&self, url: &str) -> Vec<MediaSessionId> {
        let state = self.state.lock();
        state
            .prepared
            .iter()
            .filter(|id| {
                state
                    .sessions
                    .get(id)
                    .map(|record| record.source.url == url)
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    /// Most recently prepared session for the URL.
    pub fn latest_session(&self, url: &str) -> Option<MediaSessionId> {
        self.sessions_for(url).last().copied()
    }

    /// Number of sessions ever prepared for the URL.
    pub fn prepare_count(&self, url: &str) -> usize {
        self.sessions_for(url).len()
    }

    /// Number of sessions holding native resources.
    pub fn live_sessions(&self) -> usize {
        self.state
            .lock()
            .sessions
            .values()
            .filter(|record| !record.released)
            .count()
    }

    pub fn is_playing(&self, session: MediaSessionId) -> bool {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|record| record.playing && !record.released)
            .unwrap_or(false)
    }

    pub fn is_released(&self, session: MediaSessionId) -> bool {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|record| record.released)
            .unwrap_or(false)
    }

    pub fn position_of(&self, session: MediaSessionId) -> Option<Duration> {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|record| record.position)
    }

    /// Move the playhead as if the session had been rendering.
    pub fn set_position(&self, session: MediaSessionId, position: Duration) {
        if let Some(record) = self.state.lock().sessions.get_mut(&session) {
            record.position = position;
        }
    }

    /// Seeks issued against the session, in order.
    pub fn seeks_of(&self, session: MediaSessionId) -> Vec<Duration> {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|record| record.seeks.clone())
            .unwrap_or_default()
    }

    /// Number of `play` commands the session received.
    pub fn play_calls(&self, session: MediaSessionId) -> usize {
        self.state
            .lock()
            .sessions
            .get(&session)
            .map(|record| record.play_calls)
            .unwrap_or(0)
    }
}

#[async_trait]
impl MediaEngine for MockMediaEngine {
    async fn prepare(&self, request: MediaRequest) -> Result<MediaSessionId> {
        let mut state = self.state.lock();
        if state.failing_sources.contains(&request.source.url) {
            return Err(BridgeError::OperationFailed(format!(
                "cannot open {}",
                request.source.url
            )));
        }

        let id = MediaSessionId::new();
        let readiness = if state.auto_ready {
            Readiness::Ready
        } else {
            Readiness::Pending
        };
        state.sessions.insert(
            id,
            SessionRecord {
                source: request.source,
                readiness,
                failure: None,
                playing: request.options.autoplay && readiness == Readiness::Ready,
                position: Duration::ZERO,
                seeks: Vec::new(),
                play_calls: 0,
                released: false,
                subscribers: Vec::new(),
            },
        );
        state.prepared.push(id);
        Ok(id)
    }

    async fn subscribe(&self, session: MediaSessionId) -> Result<Box<dyn MediaSignalStream>> {
        let mut state = self.state.lock();
        let record = state.live(session)?;
        let (tx, rx) = mpsc::unbounded_channel();

        match record.readiness {
            Readiness::Ready => {
                let _ = tx.send(MediaSignal::ReadyToPlay);
            }
            Readiness::Failed => {
                let _ = tx.send(MediaSignal::Failed {
                    message: record.failure.clone().unwrap_or_default(),
                });
            }
            Readiness::Pending => {}
        }
        record.subscribers.push(tx);

        Ok(Box::new(MockSignalStream { receiver: rx }))
    }

    async fn play(&self, session: MediaSessionId) -> Result<()> {
        let mut state = self.state.lock();
        let record = state.live(session)?;
        record.play_calls += 1;
        record.playing = true;
        Ok(())
    }

    async fn pause(&self, session: MediaSessionId) -> Result<()> {
        let mut state = self.state.lock();
        state.live(session)?.playing = false;
        Ok(())
    }

    async fn seek(&self, session: MediaSessionId, position: Duration) -> Result<()> {
        let mut state = self.state.lock();
        let record = state.live(session)?;
        record.position = position;
        record.seeks.push(position);
        Ok(())
    }

    async fn position(&self, session: MediaSessionId) -> Result<Duration> {
        let mut state = self.state.lock();
        Ok(state.live(session)?.position)
    }

    async fn release(&self, session: MediaSessionId) -> Result<()> {
        let mut state = self.state.lock();
        let record = state.live(session)?;
        record.released = true;
        record.playing = false;
        record.subscribers.clear();
        Ok(())
    }
}

struct MockSignalStream {
    receiver: mpsc::UnboundedReceiver<MediaSignal>,
}

#[async_trait]
impl MediaSignalStream for MockSignalStream {
    async fn next(&mut self) -> Option<MediaSignal> {
        self.receiver.recv().await
    }
}

// ============================================================================
// Lifecycle observer
// ============================================================================

/// Lifecycle observer driven by the test.
#[derive(Clone)]
pub struct MockLifecycleObserver {
    state: Arc<Mutex<LifecycleState>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<LifecycleEvent>>>>,
}

impl Default for MockLifecycleObserver {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(LifecycleState::Foreground)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockLifecycleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to every subscriber.
    pub fn emit(&self, event: LifecycleEvent) {
        if let Some(state) = event.resulting_state() {
            *self.state.lock() = state;
        }
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[async_trait]
impl LifecycleObserver for MockLifecycleObserver {
    async fn get_state(&self) -> Result<LifecycleState> {
        Ok(*self.state.lock())
    }

    async fn subscribe(&self) -> Result<Box<dyn LifecycleEventStream>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Ok(Box::new(MockLifecycleStream { receiver: rx }))
    }
}

struct MockLifecycleStream {
    receiver: mpsc::UnboundedReceiver<LifecycleEvent>,
}

#[async_trait]
impl LifecycleEventStream for MockLifecycleStream {
    async fn next(&mut self) -> Option<LifecycleEvent> {
        self.receiver.recv().await
    }
}
