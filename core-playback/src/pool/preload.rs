//! # Preload Pool
//!
//! Warmed handles waiting to be promoted, plus the background worker that
//! warms them.
//!
//! ## Concurrency
//!
//! The pool is shared between the manager task and the worker's jobs. Every
//! mutation takes the same short `parking_lot` lock and nothing awaits while
//! holding it. Besides the parked handles the pool tracks:
//!
//! - **in-flight** items, each with a ticket. The manager reserves the ticket
//!   when it queues the request, so an item cleaned up or flushed while its
//!   request is queued or its engine is preparing never gets parked
//! - **claimed** items (those in the active pool), which the worker must never
//!   park, keeping the two pools disjoint
//!
//! Promotion removes the parked handle and claims the id under one lock, so
//! no observer can see the id in both pools or lose it between them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{MediaEngine, MediaOptions, MediaRequest, MediaSessionId};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, WeakSender};
use tokio::sync::Semaphore;
use tokio::time;
use tracing::{debug, trace};

use crate::handle::{HandleId, PlaybackHandle};
use crate::item::{Item, ItemId};
use crate::manager::command::Command;

#[derive(Default)]
struct PreloadInner {
    entries: HashMap<ItemId, PlaybackHandle>,
    in_flight: HashMap<ItemId, u64>,
    claimed: HashSet<ItemId>,
    next_ticket: u64,
}

/// Concurrently accessed cache of warmed, not yet promoted handles.
#[derive(Clone, Default)]
pub(crate) struct PreloadPool {
    inner: Arc<Mutex<PreloadInner>>,
}

impl PreloadPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reserve `id` for warming. Returns `None` when the item is already
    /// parked, being warmed, or active.
    pub(crate) fn begin(&self, id: &ItemId) -> Option<u64> {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(id)
            || inner.in_flight.contains_key(id)
            || inner.claimed.contains(id)
        {
            return None;
        }
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.in_flight.insert(id.clone(), ticket);
        Some(ticket)
    }

    /// Park a warmed handle. Hands the handle back when its reservation was
    /// cancelled in the meantime.
    pub(crate) fn complete(
        &self,
        ticket: u64,
        handle: PlaybackHandle,
    ) -> std::result::Result<HandleId, PlaybackHandle> {
        let mut inner = self.inner.lock();
        let id = handle.item_id().clone();
        if inner.in_flight.get(&id) != Some(&ticket) {
            return Err(handle);
        }
        inner.in_flight.remove(&id);
        let handle_id = handle.id();
        inner.entries.insert(id, handle);
        Ok(handle_id)
    }

    /// Returns `true` while the reservation `ticket` for `id` still stands.
    pub(crate) fn is_reserved(&self, id: &ItemId, ticket: u64) -> bool {
        self.inner.lock().in_flight.get(id) == Some(&ticket)
    }

    /// Drop a reservation whose warm-up failed or was never queued.
    pub(crate) fn abandon(&self, id: &ItemId, ticket: u64) {
        let mut inner = self.inner.lock();
        if inner.in_flight.get(id) == Some(&ticket) {
            inner.in_flight.remove(id);
        }
    }

    /// Move `id` to the active side: take its parked handle (if any), cancel
    /// any warm-up in flight and claim the id.
    ///
    /// One-shot: a second call returns `None` until the item leaves the
    /// active side and is warmed again.
    pub(crate) fn promote(&self, id: &ItemId) -> Option<PlaybackHandle> {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(id);
        inner.claimed.insert(id.clone());
        inner.entries.remove(id)
    }

    /// The item left the active pool; it may be warmed again.
    pub(crate) fn release_claim(&self, id: &ItemId) {
        self.inner.lock().claimed.remove(id);
    }

    /// Take the parked handle and cancel any warm-up in flight.
    pub(crate) fn forget(&self, id: &ItemId) -> Option<PlaybackHandle> {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(id);
        inner.entries.remove(id)
    }

    /// Returns `true` if the parked handle for `id` is the instance `handle_id`.
    pub(crate) fn holds(&self, id: &ItemId, handle_id: HandleId) -> bool {
        self.inner
            .lock()
            .entries
            .get(id)
            .map_or(false, |handle| handle.id() == handle_id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &ItemId) -> bool {
        self.inner.lock().entries.contains_key(id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Parked item ids, sorted.
    pub(crate) fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.inner.lock().entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn sessions(&self) -> Vec<MediaSessionId> {
        self.inner
            .lock()
            .entries
            .values()
            .filter_map(|handle| handle.session())
            .collect()
    }

    /// Remove every parked handle and forget all reservations and claims.
    pub(crate) fn clear(&self) -> Vec<PlaybackHandle> {
        let mut inner = self.inner.lock();
        inner.in_flight.clear();
        inner.claimed.clear();
        inner.entries.drain().map(|(_, handle)| handle).collect()
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Request to warm one item under a reservation from [`PreloadPool::begin`].
#[derive(Debug)]
pub(crate) struct PreloadRequest {
    pub item: Item,
    pub ticket: u64,
}

/// Background worker that prepares cold handles and parks them in the pool.
///
/// Requests are taken in order; at most `max_concurrent` engine preparations
/// run at once. The worker never touches the active pool or the state store:
/// completions are reported to the manager as [`Command::Preloaded`].
pub(crate) struct PreloadWorker {
    pool: PreloadPool,
    engine: Arc<dyn MediaEngine>,
    commands: WeakSender<Command>,
    permits: Arc<Semaphore>,
    prepare_timeout: Duration,
}

impl PreloadWorker {
    pub(crate) fn new(
        pool: PreloadPool,
        engine: Arc<dyn MediaEngine>,
        commands: WeakSender<Command>,
        max_concurrent: usize,
        prepare_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            engine,
            commands,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            prepare_timeout,
        }
    }

    /// Start the worker. It stops once the returned sender is dropped.
    pub(crate) fn spawn(self, buffer: usize) -> mpsc::Sender<PreloadRequest> {
        let (tx, rx) = mpsc::channel(buffer);
        tokio::spawn(self.run(rx));
        tx
    }

    async fn run(self, mut requests: mpsc::Receiver<PreloadRequest>) {
        while let Some(PreloadRequest { item, ticket }) = requests.recv().await {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            if !self.pool.is_reserved(&item.id, ticket) {
                trace!(item_id = %item.id, "Preload cancelled while queued");
                continue;
            }

            let pool = self.pool.clone();
            let engine = Arc::clone(&self.engine);
            let commands = self.commands.clone();
            let prepare_timeout = self.prepare_timeout;
            tokio::spawn(async move {
                let _permit = permit;
                warm(pool, engine, commands, prepare_timeout, item, ticket).await;
            });
        }
        debug!("Preload worker stopped");
    }
}

async fn warm(
    pool: PreloadPool,
    engine: Arc<dyn MediaEngine>,
    commands: WeakSender<Command>,
    prepare_timeout: Duration,
    item: Item,
    ticket: u64,
) {
    let request = MediaRequest::new(item.source.clone()).with_options(MediaOptions {
        autoplay: false,
        muted: true,
        ..Default::default()
    });

    let session = match time::timeout(prepare_timeout, engine.prepare(request)).await {
        Ok(Ok(session)) => session,
        Ok(Err(err)) => {
            debug!(item_id = %item.id, "Preload failed: {}", err);
            pool.abandon(&item.id, ticket);
            return;
        }
        Err(_) => {
            debug!(item_id = %item.id, "Preload timed out after {:?}", prepare_timeout);
            pool.abandon(&item.id, ticket);
            return;
        }
    };

    let handle = PlaybackHandle::prepared(item.id.clone(), engine, session);
    match pool.complete(ticket, handle) {
        Ok(handle_id) => {
            trace!(item_id = %item.id, handle = %handle_id, "Preload parked");
            if let Some(sender) = commands.upgrade() {
                let _ = sender.send(Command::Preloaded { item, handle_id }).await;
            }
        }
        Err(stale) => {
            trace!(item_id = %item.id, "Discarding preload cancelled while preparing");
            stale.dispose().await;
        }
    }
}
