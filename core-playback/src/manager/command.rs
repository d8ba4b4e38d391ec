//! Messages accepted by the manager task.

use std::time::Duration;

use bridge_traits::{LifecycleEvent, MediaSessionId, MediaSignal};
use tokio::sync::oneshot;

use crate::error::Result;
use crate::handle::HandleId;
use crate::item::{Item, ItemId};
use crate::manager::{PoolSnapshot, SurfaceBinding};

#[derive(Debug)]
pub(crate) enum Command {
    // ------------------------------------------------------------------
    // From the public handle
    // ------------------------------------------------------------------
    Focus {
        item_id: ItemId,
        reply: oneshot::Sender<Result<()>>,
    },
    LeftRetentionWindow {
        item_id: ItemId,
        reply: oneshot::Sender<()>,
    },
    Acquire {
        item: Item,
        reply: oneshot::Sender<SurfaceBinding>,
    },
    Preload {
        item_id: ItemId,
        reply: oneshot::Sender<Result<()>>,
    },
    UpdateFeed {
        items: Vec<Item>,
        append: bool,
        reply: oneshot::Sender<usize>,
    },
    Pause {
        item_id: ItemId,
        reply: oneshot::Sender<()>,
    },
    Resume {
        item_id: ItemId,
        reply: oneshot::Sender<()>,
    },
    PauseAll {
        except: Option<ItemId>,
        reply: oneshot::Sender<()>,
    },
    Retry {
        item_id: ItemId,
        reply: oneshot::Sender<()>,
    },
    Lifecycle {
        event: LifecycleEvent,
        reply: Option<oneshot::Sender<()>>,
    },
    Focused {
        reply: oneshot::Sender<Option<ItemId>>,
    },
    Snapshot {
        reply: oneshot::Sender<PoolSnapshot>,
    },
    LastPosition {
        item_id: ItemId,
        reply: oneshot::Sender<Option<Duration>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },

    // ------------------------------------------------------------------
    // From tasks the manager spawned
    // ------------------------------------------------------------------
    /// The engine finished (or failed) allocating a session for a pending handle.
    Constructed {
        item_id: ItemId,
        handle_id: HandleId,
        result: std::result::Result<MediaSessionId, String>,
    },
    /// The preload worker parked a warmed handle.
    Preloaded { item: Item, handle_id: HandleId },
    Signal {
        item_id: ItemId,
        handle_id: HandleId,
        signal: MediaSignal,
    },
    PositionSample {
        item_id: ItemId,
        handle_id: HandleId,
        position: Duration,
    },
    RetryDue { item_id: ItemId, ticket: u64 },
}
