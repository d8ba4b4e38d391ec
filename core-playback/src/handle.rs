//! # Playback Handles
//!
//! A [`PlaybackHandle`] owns one native player session for one feed item.
//!
//! ## Ownership
//!
//! A handle lives in exactly one place at a time: the active pool, the
//! preload pool, or the task that is creating it. Disposing it releases the
//! engine session and ends its observation task. Dropping it without
//! disposing still releases the session on the current runtime, so a handle
//! lost on an error path cannot leak a decoder.
//!
//! ## Observation
//!
//! [`PlaybackHandle::observe`] spawns a task that forwards the session's
//! signals and periodic position samples to the manager. The task is tied to
//! a cancellation token whose drop guard the handle keeps; replacing the
//! observation or dropping the handle stops it. Every message carries the
//! handle's [`HandleId`] so the manager can ignore messages from handles it
//! has already replaced.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{MediaEngine, MediaSessionId};
use tokio::sync::mpsc::WeakSender;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace, warn};

use crate::item::ItemId;
use crate::manager::command::Command;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of one handle instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// One native player bound to one item.
pub(crate) struct PlaybackHandle {
    id: HandleId,
    item_id: ItemId,
    engine: Arc<dyn MediaEngine>,
    /// `None` while the engine is still allocating the session.
    session: Option<MediaSessionId>,
    last_position: Duration,
    observation: Option<DropGuard>,
}

impl PlaybackHandle {
    /// Handle whose session is still being prepared.
    pub(crate) fn pending(item_id: ItemId, engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            id: HandleId::next(),
            item_id,
            engine,
            session: None,
            last_position: Duration::ZERO,
            observation: None,
        }
    }

    /// Handle around an already prepared session.
    pub(crate) fn prepared(
        item_id: ItemId,
        engine: Arc<dyn MediaEngine>,
        session: MediaSessionId,
    ) -> Self {
        let mut handle = Self::pending(item_id, engine);
        handle.session = Some(session);
        handle
    }

    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub(crate) fn session(&self) -> Option<MediaSessionId> {
        self.session
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.session.is_none()
    }

    pub(crate) fn set_last_position(&mut self, position: Duration) {
        self.last_position = position;
    }

    /// Bind the session the engine finished preparing.
    pub(crate) fn attach(&mut self, session: MediaSessionId) {
        self.session = Some(session);
    }

    pub(crate) async fn play(&self) {
        if let Some(session) = self.session {
            if let Err(err) = self.engine.play(session).await {
                warn!(item_id = %self.item_id, handle = %self.id, "play failed: {}", err);
            }
        }
    }

    pub(crate) async fn pause(&self) {
        if let Some(session) = self.session {
            if let Err(err) = self.engine.pause(session).await {
                debug!(item_id = %self.item_id, handle = %self.id, "pause failed: {}", err);
            }
        }
    }

    pub(crate) async fn seek(&mut self, position: Duration) {
        let Some(session) = self.session else {
            return;
        };
        match self.engine.seek(session, position).await {
            Ok(()) => self.last_position = position,
            Err(err) => warn!(item_id = %self.item_id, handle = %self.id, "seek failed: {}", err),
        }
    }

    /// Current position from the engine, falling back to the last sample.
    pub(crate) async fn current_position(&mut self) -> Duration {
        if let Some(session) = self.session {
            if let Ok(position) = self.engine.position(session).await {
                self.last_position = position;
            }
        }
        self.last_position
    }

    /// Start (or restart) forwarding this handle's signals to the manager.
    ///
    /// A previous observation task is cancelled first. Pending handles are not
    /// observed; call again once a session is attached.
    pub(crate) fn observe(&mut self, commands: WeakSender<Command>, sample_interval: Duration) {
        self.observation = None;

        let Some(session) = self.session else {
            return;
        };

        let token = CancellationToken::new();
        tokio::spawn(observe_session(
            Arc::clone(&self.engine),
            session,
            self.item_id.clone(),
            self.id,
            commands,
            sample_interval,
            token.clone(),
        ));
        self.observation = Some(token.drop_guard());
    }

    /// Stop observation, pause and release the session.
    pub(crate) async fn dispose(mut self) {
        self.observation = None;

        if let Some(session) = self.session.take() {
            let _ = self.engine.pause(session).await;
            if let Err(err) = self.engine.release(session).await {
                debug!(item_id = %self.item_id, handle = %self.id, "release failed: {}", err);
            }
        }
        trace!(item_id = %self.item_id, handle = %self.id, "Handle disposed");
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let engine = Arc::clone(&self.engine);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = engine.release(session).await;
                });
            }
            Err(_) => warn!(
                item_id = %self.item_id,
                handle = %self.id,
                "Handle dropped outside a runtime; session {} not released",
                session
            ),
        }
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("id", &self.id)
            .field("item_id", &self.item_id)
            .field("session", &self.session)
            .field("observed", &self.observation.is_some())
            .finish()
    }
}

async fn observe_session(
    engine: Arc<dyn MediaEngine>,
    session: MediaSessionId,
    item_id: ItemId,
    handle_id: HandleId,
    commands: WeakSender<Command>,
    sample_interval: Duration,
    token: CancellationToken,
) {
    let mut signals = tokio::select! {
        _ = token.cancelled() => return,
        subscribed = engine.subscribe(session) => match subscribed {
            Ok(stream) => stream,
            Err(err) => {
                debug!(item_id = %item_id, handle = %handle_id, "subscribe failed: {}", err);
                return;
            }
        },
    };

    let mut ticker = time::interval_at(Instant::now() + sample_interval, sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let command = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            signal = signals.next() => match signal {
                Some(signal) => Command::Signal {
                    item_id: item_id.clone(),
                    handle_id,
                    signal,
                },
                None => break,
            },
            _ = ticker.tick() => match engine.position(session).await {
                Ok(position) => Command::PositionSample {
                    item_id: item_id.clone(),
                    handle_id,
                    position,
                },
                Err(_) => break,
            },
        };

        let Some(sender) = commands.upgrade() else {
            break;
        };
        if sender.send(command).await.is_err() {
            break;
        }
    }

    trace!(item_id = %item_id, handle = %handle_id, "Observation ended");
}
