//! The manager task: single writer of pools, state and ledger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{LifecycleEvent, MediaEngine, MediaRequest, MediaSessionId, MediaSignal};
use core_runtime::config::FeatureFlags;
use core_runtime::events::{
    CoreEvent, EventBus, FeedEvent, LifecycleEvent as LifecycleReaction, PlaybackEvent,
};
use core_runtime::logging::redact_url;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError, WeakSender};
use tokio::sync::oneshot;
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::config::PlayerPoolConfig;
use crate::error::{ItemFailure, PlaybackError, Result};
use crate::feed::FeedList;
use crate::handle::{HandleId, PlaybackHandle};
use crate::item::{Item, ItemId};
use crate::pool::{ActivePool, PreloadPool, PreloadRequest, PreloadWorker};
use crate::recovery::RetryScheduler;
use crate::state::{PlaybackState, PositionLedger, StateStore};

use super::command::Command;
use super::{PoolSnapshot, SurfaceBinding};

/// How much of an item's record a cleanup drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cleanup {
    /// Release the players but keep state, failure, source and position so
    /// a replacement can pick up where the failed one stopped.
    Recovery,
    /// The item left the retention window: forget it entirely, ledger
    /// included.
    Full,
}

pub(super) struct Actor {
    config: PlayerPoolConfig,
    features: FeatureFlags,
    engine: Arc<dyn MediaEngine>,
    commands: WeakSender<Command>,
    states: Arc<RwLock<StateStore>>,
    events: EventBus,

    active: ActivePool,
    preload: PreloadPool,
    preload_requests: mpsc::Sender<PreloadRequest>,
    retries: RetryScheduler,
    ledger: PositionLedger,
    feed: FeedList,

    focused: Option<ItemId>,
    foreground: bool,
    /// Feed length at the last `EndApproaching`; re-armed when the feed grows.
    end_reported_at: Option<usize>,
    /// Acquire replies waiting for a pending handle's session.
    waiters: HashMap<HandleId, Vec<oneshot::Sender<SurfaceBinding>>>,
}

impl Actor {
    pub(super) fn new(
        engine: Arc<dyn MediaEngine>,
        config: PlayerPoolConfig,
        features: FeatureFlags,
        commands: WeakSender<Command>,
        states: Arc<RwLock<StateStore>>,
        events: EventBus,
    ) -> Self {
        let preload = PreloadPool::new();
        let preload_requests = PreloadWorker::new(
            preload.clone(),
            Arc::clone(&engine),
            commands.clone(),
            config.max_concurrent_preloads,
            config.prepare_timeout,
        )
        .spawn(config.command_buffer);

        Self {
            active: ActivePool::new(config.max_active_players),
            retries: RetryScheduler::new(config.retry_delay),
            config,
            features,
            engine,
            commands,
            states,
            events,
            preload,
            preload_requests,
            ledger: PositionLedger::new(),
            feed: FeedList::new(),
            focused: None,
            foreground: true,
            end_reported_at: None,
            waiters: HashMap::new(),
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            if let Command::Shutdown { reply } = command {
                self.teardown().await;
                let _ = reply.send(());
                info!("Playback manager stopped");
                return;
            }
            self.handle(command).await;
        }

        self.teardown().await;
        debug!("Playback manager dropped by every owner");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Focus { item_id, reply } => {
                let result = self.focus(item_id).await;
                let _ = reply.send(result);
            }
            Command::LeftRetentionWindow { item_id, reply } => {
                self.cleanup(&item_id, Cleanup::Full).await;
                let _ = reply.send(());
            }
            Command::Acquire { item, reply } => self.acquire_for_surface(item, reply).await,
            Command::Preload { item_id, reply } => {
                let result = match self.feed.get(&item_id).cloned() {
                    Some(item) => {
                        self.request_preload(item);
                        Ok(())
                    }
                    None => Err(PlaybackError::UnknownItem(item_id)),
                };
                let _ = reply.send(result);
            }
            Command::UpdateFeed {
                items,
                append,
                reply,
            } => {
                let added = if append {
                    self.feed.append(items)
                } else {
                    self.end_reported_at = None;
                    self.feed.replace(items)
                };
                debug!(total = self.feed.len(), added, append, "Feed updated");
                self.publish(CoreEvent::Feed(FeedEvent::Updated {
                    total: self.feed.len(),
                    added,
                }));
                let _ = reply.send(added);
            }
            Command::Pause { item_id, reply } => {
                self.pause_item(&item_id).await;
                let _ = reply.send(());
            }
            Command::Resume { item_id, reply } => {
                if self.states.read().state(&item_id).can_play() {
                    self.start_playback(&item_id).await;
                } else {
                    debug!(item_id = %item_id, "Resume ignored; item cannot play");
                }
                let _ = reply.send(());
            }
            Command::PauseAll { except, reply } => {
                for id in self.active.ids_oldest_first() {
                    if except.as_ref() != Some(&id) {
                        self.pause_item(&id).await;
                    }
                }
                let _ = reply.send(());
            }
            Command::Retry { item_id, reply } => {
                self.retry_now(&item_id).await;
                let _ = reply.send(());
            }
            Command::Lifecycle { event, reply } => {
                self.on_lifecycle(event).await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            Command::Focused { reply } => {
                let _ = reply.send(self.focused.clone());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::LastPosition { item_id, reply } => {
                let _ = reply.send(self.ledger.get(&item_id));
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop.
                let _ = reply.send(());
            }
            Command::Constructed {
                item_id,
                handle_id,
                result,
            } => self.on_constructed(item_id, handle_id, result).await,
            Command::Preloaded { item, handle_id } => self.on_preloaded(item, handle_id),
            Command::Signal {
                item_id,
                handle_id,
                signal,
            } => self.on_signal(item_id, handle_id, signal).await,
            Command::PositionSample {
                item_id,
                handle_id,
                position,
            } => {
                if self.states.read().state(&item_id) != PlaybackState::Playing {
                    return;
                }
                if let Some(handle) = self.active.current_mut(&item_id, handle_id) {
                    handle.set_last_position(position);
                    self.ledger.record(&item_id, position);
                }
            }
            Command::RetryDue { item_id, ticket } => self.on_retry_due(item_id, ticket).await,
        }
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    async fn focus(&mut self, item_id: ItemId) -> Result<()> {
        let item = self
            .resolve(&item_id)
            .ok_or_else(|| PlaybackError::UnknownItem(item_id.clone()))?;

        let previous = self.focused.clone();
        if let Some(previous) = previous.as_ref().filter(|previous| **previous != item_id) {
            self.pause_item(previous).await;
        }
        self.focused = Some(item_id.clone());
        self.retries.cancel(&item_id);

        let failure = {
            let states = self.states.read();
            match states.entry(&item_id) {
                Some(PlaybackState::Failed) => states.error(&item_id).cloned(),
                _ => None,
            }
        };

        match failure {
            Some(failure) if failure.is_recoverable() && self.features.enable_auto_recovery => {
                debug!(item_id = %item_id, "Recreating failed item on focus");
                self.recreate(&item).await;
            }
            Some(_) if self.active.contains(&item_id) => {
                debug!(item_id = %item_id, "Focused item stays failed");
            }
            _ => {
                self.acquire(&item).await;
                if self.foreground && self.states.read().state(&item_id).can_play() {
                    self.start_playback(&item_id).await;
                }
            }
        }

        if self.features.enable_neighbor_preload {
            let neighbors: Vec<Item> = self
                .feed
                .neighbors(&item_id, self.config.preload_radius)
                .into_iter()
                .filter(|neighbor| !self.active.contains(&neighbor.id))
                .cloned()
                .collect();
            for neighbor in neighbors {
                self.request_preload(neighbor);
            }
        }

        self.trim().await;

        self.report_end_approach(&item_id);

        info!(item_id = %item_id, previous = ?previous, "Focus changed");
        self.publish(CoreEvent::Playback(PlaybackEvent::FocusChanged {
            item_id: item_id.to_string(),
            previous: previous.map(|id| id.to_string()),
        }));
        Ok(())
    }

    /// The item for `id`, from the feed or from the source recorded when it
    /// was last acquired.
    fn resolve(&self, id: &ItemId) -> Option<Item> {
        if let Some(item) = self.feed.get(id) {
            return Some(item.clone());
        }
        self.states.read().source(id).map(|source| Item {
            id: id.clone(),
            source: source.clone(),
        })
    }

    fn request_preload(&self, item: Item) {
        let Some(ticket) = self.preload.begin(&item.id) else {
            trace!(item_id = %item.id, "Preload skipped; already warm or active");
            return;
        };

        match self.preload_requests.try_send(PreloadRequest { item, ticket }) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                warn!(item_id = %request.item.id, "Preload queue full; skipping");
                self.preload.abandon(&request.item.id, ticket);
            }
            Err(TrySendError::Closed(request)) => {
                debug!("Preload worker stopped");
                self.preload.abandon(&request.item.id, ticket);
            }
        }
    }

    // ------------------------------------------------------------------
    // Acquisition
    // ------------------------------------------------------------------

    /// Register a handle for `item` in the active pool and observe it.
    /// Returns the id of the handle now registered for the item.
    async fn acquire(&mut self, item: &Item) -> HandleId {
        self.states
            .write()
            .record_source(&item.id, item.source.clone());
        let resume_at = self.ledger.get(&item.id);
        let interval = self.config.position_sample_interval;

        if let Some(handle) = self.active.get_mut(&item.id) {
            if let Some(position) = resume_at {
                handle.seek(position).await;
            }
            handle.observe(self.commands.clone(), interval);
            trace!(item_id = %item.id, handle = %handle.id(), "Reusing active handle");
            return handle.id();
        }

        // A new handle supersedes any recovery still waiting to fire.
        self.retries.cancel(&item.id);

        if let Some(mut handle) = self.preload.promote(&item.id) {
            if let Some(position) = resume_at {
                handle.seek(position).await;
            }
            handle.observe(self.commands.clone(), interval);
            let handle_id = handle.id();
            self.register(handle).await;
            if matches!(
                self.states.read().entry(&item.id),
                None | Some(PlaybackState::Failed)
            ) {
                self.set_state(&item.id, PlaybackState::Loading);
            }
            debug!(item_id = %item.id, handle = %handle_id, "Promoted preloaded handle");
            return handle_id;
        }

        self.construct(item).await
    }

    async fn acquire_for_surface(&mut self, item: Item, reply: oneshot::Sender<SurfaceBinding>) {
        let handle_id = self.acquire(&item).await;
        self.trim().await;

        let session = match self.active.get(&item.id) {
            Some(handle) if handle.id() == handle_id => {
                if handle.is_pending() {
                    self.waiters.entry(handle_id).or_default().push(reply);
                    return;
                }
                handle.session()
            }
            _ => None,
        };
        let _ = reply.send(SurfaceBinding {
            item_id: item.id,
            handle_id,
            session,
        });
    }

    /// Insert a handle as the newest active entry, disposing any handle it
    /// displaces.
    async fn register(&mut self, handle: PlaybackHandle) {
        if let Some(displaced) = self.active.insert(handle) {
            self.dispose(displaced).await;
        }
    }

    /// Create a fresh handle in `Loading`. The engine allocates its session
    /// in the background and reports back with [`Command::Constructed`].
    async fn construct(&mut self, item: &Item) -> HandleId {
        if let Some(parked) = self.preload.promote(&item.id) {
            parked.dispose().await;
        }

        let handle = PlaybackHandle::pending(item.id.clone(), Arc::clone(&self.engine));
        let handle_id = handle.id();
        self.register(handle).await;
        self.set_state(&item.id, PlaybackState::Loading);

        let engine = Arc::clone(&self.engine);
        let commands = self.commands.clone();
        let prepare_timeout = self.config.prepare_timeout;
        let request = MediaRequest::new(item.source.clone());
        let item_id = item.id.clone();
        tokio::spawn(async move {
            let result = match time::timeout(prepare_timeout, engine.prepare(request)).await {
                Ok(Ok(session)) => Ok(session),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err(format!("prepare timed out after {:?}", prepare_timeout)),
            };

            let session = result.as_ref().ok().copied();
            let delivered = match commands.upgrade() {
                Some(sender) => sender
                    .send(Command::Constructed {
                        item_id,
                        handle_id,
                        result,
                    })
                    .await
                    .is_ok(),
                None => false,
            };
            if !delivered {
                if let Some(session) = session {
                    let _ = engine.release(session).await;
                }
            }
        });

        debug!(
            item_id = %item.id,
            handle = %handle_id,
            source = %redact_url(&item.source.url),
            "Constructing handle"
        );
        handle_id
    }

    async fn on_constructed(
        &mut self,
        item_id: ItemId,
        handle_id: HandleId,
        result: std::result::Result<MediaSessionId, String>,
    ) {
        let resume_at = self.ledger.get(&item_id);
        let interval = self.config.position_sample_interval;

        let Some(handle) = self.active.current_mut(&item_id, handle_id) else {
            trace!(item_id = %item_id, handle = %handle_id, "Discarding stale construction");
            if let Ok(session) = result {
                let _ = self.engine.release(session).await;
            }
            return;
        };

        match result {
            Ok(session) => {
                handle.attach(session);
                if let Some(position) = resume_at {
                    handle.seek(position).await;
                }
                handle.observe(self.commands.clone(), interval);
                self.answer_waiters(&item_id, handle_id, Some(session));
            }
            Err(message) => {
                self.answer_waiters(&item_id, handle_id, None);
                self.fail(&item_id, ItemFailure::Construction(message))
                    .await;
            }
        }
    }

    fn answer_waiters(
        &mut self,
        item_id: &ItemId,
        handle_id: HandleId,
        session: Option<MediaSessionId>,
    ) {
        for waiter in self.waiters.remove(&handle_id).unwrap_or_default() {
            let _ = waiter.send(SurfaceBinding {
                item_id: item_id.clone(),
                handle_id,
                session,
            });
        }
    }

    fn on_preloaded(&mut self, item: Item, handle_id: HandleId) {
        if !self.preload.holds(&item.id, handle_id) {
            return;
        }

        {
            let mut states = self.states.write();
            states.record_source(&item.id, item.source.clone());
        }
        if self.states.read().entry(&item.id).is_none() {
            self.set_state(&item.id, PlaybackState::Loading);
        }
        debug!(item_id = %item.id, handle = %handle_id, "Item preloaded");
        self.publish(CoreEvent::Playback(PlaybackEvent::Preloaded {
            item_id: item.id.to_string(),
        }));
    }

    // ------------------------------------------------------------------
    // Playback state machine
    // ------------------------------------------------------------------

    async fn on_signal(&mut self, item_id: ItemId, handle_id: HandleId, signal: MediaSignal) {
        if !self.active.is_current(&item_id, handle_id) {
            trace!(item_id = %item_id, handle = %handle_id, "Ignoring signal from stale handle");
            return;
        }

        let state = self.states.read().entry(&item_id);
        match signal {
            MediaSignal::ReadyToPlay => {
                if !matches!(state, None | Some(PlaybackState::Loading)) {
                    return;
                }
                self.states.write().clear_error(&item_id);
                self.set_state(&item_id, PlaybackState::Ready);
                if self.foreground && self.is_focused(&item_id) {
                    self.start_playback(&item_id).await;
                }
            }
            MediaSignal::Failed { message } => {
                let failure = match state {
                    Some(PlaybackState::Failed) => return,
                    None | Some(PlaybackState::Loading) => ItemFailure::Construction(message),
                    Some(_) => ItemFailure::Playback(message),
                };
                self.fail(&item_id, failure).await;
            }
            MediaSignal::FailedToPlayToEnd { message } => {
                if state != Some(PlaybackState::Failed) {
                    self.fail(&item_id, ItemFailure::Stall(message)).await;
                }
            }
            MediaSignal::PlayedToEnd => {
                if state != Some(PlaybackState::Playing) {
                    return;
                }
                if let Some(handle) = self.active.get_mut(&item_id) {
                    handle.seek(Duration::ZERO).await;
                    handle.play().await;
                }
                self.ledger.record(&item_id, Duration::ZERO);
                trace!(item_id = %item_id, "Looping");
                self.publish(CoreEvent::Playback(PlaybackEvent::Looped {
                    item_id: item_id.to_string(),
                }));
            }
            MediaSignal::Stalled => {
                debug!(item_id = %item_id, "Playback stalled; waiting for the engine to recover");
            }
        }
    }

    async fn fail(&mut self, item_id: &ItemId, failure: ItemFailure) {
        warn!(
            item_id = %item_id,
            kind = failure.kind().as_str(),
            "Item failed: {}",
            failure.message()
        );

        self.states.write().record_failure(item_id, failure.clone());
        self.set_state(item_id, PlaybackState::Failed);
        self.publish(CoreEvent::Playback(PlaybackEvent::Failed {
            item_id: item_id.to_string(),
            kind: failure.kind().as_str().to_string(),
            message: failure.message().to_string(),
            recoverable: failure.is_recoverable(),
        }));

        if failure.is_recoverable()
            && self.features.enable_auto_recovery
            && self.is_focused(item_id)
        {
            self.cleanup(item_id, Cleanup::Recovery).await;
            self.retries.schedule(item_id, self.commands.clone());
            self.publish(CoreEvent::Playback(PlaybackEvent::RecoveryScheduled {
                item_id: item_id.to_string(),
                delay_ms: self.retries.delay().as_millis() as u64,
            }));
        }
    }

    async fn on_retry_due(&mut self, item_id: ItemId, ticket: u64) {
        if !self.retries.take_due(&item_id, ticket) {
            trace!(item_id = %item_id, ticket, "Ignoring superseded retry");
            return;
        }
        match self.resolve(&item_id) {
            Some(item) => {
                self.recreate(&item).await;
                self.trim().await;
            }
            None => debug!(item_id = %item_id, "Retry dropped; source unknown"),
        }
    }

    /// User-initiated recovery: no delay, any failure kind.
    async fn retry_now(&mut self, item_id: &ItemId) {
        self.retries.cancel(item_id);
        if self.states.read().entry(item_id) != Some(PlaybackState::Failed) {
            debug!(item_id = %item_id, "Retry ignored; item has not failed");
            return;
        }
        match self.resolve(item_id) {
            Some(item) => {
                self.recreate(&item).await;
                self.trim().await;
            }
            None => debug!(item_id = %item_id, "Retry dropped; source unknown"),
        }
    }

    /// Replace the item's players with a freshly constructed handle.
    async fn recreate(&mut self, item: &Item) {
        self.cleanup(&item.id, Cleanup::Recovery).await;
        let handle_id = self.construct(item).await;
        info!(item_id = %item.id, handle = %handle_id, "Recovering item");
        self.publish(CoreEvent::Playback(PlaybackEvent::RecoveryStarted {
            item_id: item.id.to_string(),
        }));
    }

    async fn start_playback(&mut self, item_id: &ItemId) {
        let Some(handle) = self.active.get(item_id) else {
            return;
        };
        if handle.is_pending() {
            return;
        }
        handle.play().await;
        self.set_state(item_id, PlaybackState::Playing);
    }

    /// Pause an active item and persist its position.
    async fn pause_item(&mut self, item_id: &ItemId) {
        let Some(handle) = self.active.get_mut(item_id) else {
            return;
        };
        if handle.is_pending() {
            return;
        }
        let position = handle.current_position().await;
        handle.pause().await;
        self.ledger.record(item_id, position);

        if self.states.read().entry(item_id) == Some(PlaybackState::Playing) {
            self.set_state(item_id, PlaybackState::Paused);
        }
    }

    // ------------------------------------------------------------------
    // Eviction and cleanup
    // ------------------------------------------------------------------

    /// Evict the oldest active handles until the pool fits its bound. The
    /// focused item is never evicted and evicted items keep their state.
    async fn trim(&mut self) {
        let except = self.focused.clone();
        for item_id in self.active.overflow(except.as_ref()) {
            let Some(mut handle) = self.active.remove(&item_id) else {
                continue;
            };
            let position = if handle.is_pending() {
                self.ledger.get(&item_id).unwrap_or_default()
            } else {
                let position = handle.current_position().await;
                self.ledger.record(&item_id, position);
                position
            };
            self.dispose(handle).await;
            self.preload.release_claim(&item_id);

            debug!(item_id = %item_id, position = ?position, "Evicted active handle");
            self.publish(CoreEvent::Playback(PlaybackEvent::Evicted {
                item_id: item_id.to_string(),
                position_ms: position.as_millis() as u64,
            }));
        }
    }

    async fn cleanup(&mut self, item_id: &ItemId, mode: Cleanup) {
        if let Some(parked) = self.preload.forget(item_id) {
            parked.dispose().await;
        }

        if let Some(mut handle) = self.active.remove(item_id) {
            if !handle.is_pending() {
                let position = handle.current_position().await;
                self.ledger.record(item_id, position);
            }
            self.dispose(handle).await;
        }
        self.preload.release_claim(item_id);

        if mode == Cleanup::Full {
            self.retries.cancel(item_id);
            self.states.write().forget(item_id);
            self.ledger.remove(item_id);
            if self.focused.as_ref() == Some(item_id) {
                self.focused = None;
            }
            debug!(item_id = %item_id, "Item cleaned up");
            self.publish(CoreEvent::Playback(PlaybackEvent::CleanedUp {
                item_id: item_id.to_string(),
            }));
        }
    }

    async fn dispose(&mut self, handle: PlaybackHandle) {
        let item_id = handle.item_id().clone();
        self.answer_waiters(&item_id, handle.id(), None);
        handle.dispose().await;
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    async fn on_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::EnteredBackground | LifecycleEvent::Suspended => {
                self.enter_background().await
            }
            LifecycleEvent::EnteredForeground => self.enter_foreground().await,
            LifecycleEvent::MemoryWarning => self.flush().await,
        }
    }

    async fn enter_background(&mut self) {
        self.foreground = false;

        let active = self.active.ids_oldest_first();
        for item_id in &active {
            self.pause_item(item_id).await;
        }
        let parked = self.preload.sessions();
        for session in &parked {
            let _ = self.engine.pause(*session).await;
        }

        let paused = active.len() + parked.len();
        info!(paused, "Entered background");
        self.publish(CoreEvent::Lifecycle(LifecycleReaction::Backgrounded {
            paused,
        }));
    }

    async fn enter_foreground(&mut self) {
        self.foreground = true;

        let mut resumed = None;
        if let Some(item_id) = self.focused.clone() {
            if self.states.read().state(&item_id).can_play() {
                self.start_playback(&item_id).await;
                resumed = Some(item_id.to_string());
            }
        }

        info!(resumed = ?resumed, "Entered foreground");
        self.publish(CoreEvent::Lifecycle(LifecycleReaction::Foregrounded {
            resumed,
        }));
    }

    /// Memory pressure: drop every player and every per-item record.
    async fn flush(&mut self) {
        let released = self.release_all().await;
        self.states.write().clear();
        self.ledger.clear();
        self.focused = None;

        warn!(released, "Flushed every player under memory pressure");
        self.publish(CoreEvent::Lifecycle(LifecycleReaction::MemoryFlushed {
            released,
        }));
    }

    /// Cancel retries and dispose every handle in both pools.
    async fn release_all(&mut self) -> usize {
        self.retries.cancel_all();

        let parked = self.preload.clear();
        let active = self.active.drain();
        let released = parked.len() + active.len();

        for handle in parked {
            handle.dispose().await;
        }
        for handle in active {
            self.dispose(handle).await;
        }
        released
    }

    async fn teardown(&mut self) {
        let released = self.release_all().await;
        debug!(released, "Released every player");
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Publish `EndApproaching` once per feed length, the first time focus
    /// comes within the threshold of the end.
    fn report_end_approach(&mut self, item_id: &ItemId) {
        let Some(remaining) = self.feed.remaining_after(item_id) else {
            return;
        };
        let total = self.feed.len();
        if remaining >= self.config.end_approach_threshold
            || self.end_reported_at == Some(total)
        {
            return;
        }

        self.end_reported_at = Some(total);
        debug!(remaining, total, "Feed end approaching");
        self.publish(CoreEvent::Feed(FeedEvent::EndApproaching { remaining }));
    }

    fn is_focused(&self, item_id: &ItemId) -> bool {
        self.focused.as_ref() == Some(item_id)
    }

    fn set_state(&self, item_id: &ItemId, state: PlaybackState) {
        let changed = self.states.write().set_state(item_id, state);
        if changed {
            trace!(item_id = %item_id, state = %state, "State changed");
            self.publish(CoreEvent::Playback(PlaybackEvent::StateChanged {
                item_id: item_id.to_string(),
                state: state.as_str().to_string(),
            }));
        }
    }

    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            active: self.active.ids_oldest_first(),
            preloaded: self.preload.ids(),
            focused: self.focused.clone(),
            pending_retries: self.retries.pending_ids(),
            ledger_entries: self.ledger.len(),
            foreground: self.foreground,
        }
    }

    fn publish(&self, event: CoreEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(event);
    }
}
