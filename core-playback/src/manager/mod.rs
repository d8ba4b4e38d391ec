//! # Playback Resource Manager
//!
//! Decides which feed items hold native players, warms the neighbours of the
//! focused item, evicts distant players and recovers failed ones.
//!
//! ## Overview
//!
//! [`PlaybackManager`] is a cheap, cloneable handle to a single manager task.
//! The task owns the active pool, the position ledger, the feed list and the
//! retry timers, and is the only writer of the shared [`StateStore`]. Every
//! operation is a message on a bounded command channel:
//!
//! - The UI reports focus changes and items leaving the retention window
//! - Player sessions report readiness, failures and position samples
//! - The preload worker reports warmed handles
//! - Retry timers report that a recovery is due
//!
//! Because one task applies all of these in order, no two state mutations
//! ever run concurrently. Messages from player sessions and timers carry the
//! identity of the handle (or retry) they belong to, and the task drops any
//! that refer to something it has since replaced.
//!
//! ## Workflow
//!
//! ### Focus
//! 1. Pause the previously focused item and record its position
//! 2. Promote the focused item's handle (active, then preloaded, then fresh)
//! 3. Start playback once it is ready and the app is in the foreground
//! 4. Warm its neighbours in the background
//! 5. Evict the oldest active handles beyond the pool bound
//!
//! ### Recovery
//! 1. A focused item fails with a construction or stall failure
//! 2. Its handle is disposed; state, error and position are kept
//! 3. After the retry delay a new handle is created from the recorded source
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{Item, PlaybackManager, PlayerPoolConfig};
//!
//! let manager = PlaybackManager::spawn(engine, PlayerPoolConfig::default())?;
//! manager.set_feed(items).await?;
//!
//! manager.notify_focus("a1").await?;
//! let binding = manager.acquire_handle(item).await?;
//! println!("{} is {}", binding.item_id, manager.current_state(&binding.item_id));
//! ```

mod actor;
pub(crate) mod command;

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{LifecycleEvent, LifecycleObserver, MediaEngine, MediaSessionId};
use core_runtime::config::{CoreConfig, FeatureFlags};
use core_runtime::events::{EventBus, EventStream};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::config::PlayerPoolConfig;
use crate::error::{ItemFailure, PlaybackError, Result};
use crate::handle::HandleId;
use crate::item::{Item, ItemId};
use crate::lifecycle;
use crate::state::{PlaybackState, StateStore};

use actor::Actor;
use command::Command;

/// What the UI binds to its render surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceBinding {
    pub item_id: ItemId,
    /// Handle instance the binding belongs to.
    pub handle_id: HandleId,
    /// Native session to render. `None` when the player could not be created
    /// or was released before it was; the item's state says why.
    pub session: Option<MediaSessionId>,
}

/// Pool membership at one instant, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    /// Active items, oldest first.
    pub active: Vec<ItemId>,
    /// Parked items, sorted.
    pub preloaded: Vec<ItemId>,
    pub focused: Option<ItemId>,
    /// Items with a recovery timer armed, sorted.
    pub pending_retries: Vec<ItemId>,
    pub ledger_entries: usize,
    pub foreground: bool,
}

/// Handle to the playback resource manager.
///
/// Cloning is cheap; all clones talk to the same manager task. The task stops
/// when [`PlaybackManager::shutdown`] is called or the last clone is dropped,
/// releasing every player it holds.
#[derive(Clone)]
pub struct PlaybackManager {
    commands: mpsc::Sender<Command>,
    states: Arc<RwLock<StateStore>>,
    events: EventBus,
}

impl PlaybackManager {
    /// Start a manager with default feature flags and a private event bus.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: Arc<dyn MediaEngine>, config: PlayerPoolConfig) -> Result<Self> {
        Self::start(engine, config, FeatureFlags::default(), EventBus::default())
    }

    /// Start a manager wired from the core configuration.
    ///
    /// Publishes on a bus sized by `event_buffer_size` and, when lifecycle
    /// handling is enabled, attaches the configured lifecycle observer.
    pub fn from_core_config(core: &CoreConfig, config: PlayerPoolConfig) -> Result<Self> {
        core.validate()?;

        let manager = Self::start(
            Arc::clone(&core.media_engine),
            config,
            core.features,
            EventBus::new(core.event_buffer_size),
        )?;

        if core.features.enable_lifecycle_handling {
            if let Some(observer) = &core.lifecycle_observer {
                manager.attach_lifecycle_observer(Arc::clone(observer));
            }
        }

        Ok(manager)
    }

    fn start(
        engine: Arc<dyn MediaEngine>,
        config: PlayerPoolConfig,
        features: FeatureFlags,
        events: EventBus,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            core_runtime::Error::Internal("PlaybackManager requires a tokio runtime".to_string())
        })?;

        let (tx, rx) = mpsc::channel(config.command_buffer);
        let states = Arc::new(RwLock::new(StateStore::new()));

        info!(
            max_active_players = config.max_active_players,
            preload_radius = config.preload_radius,
            "Starting playback manager"
        );

        let actor = Actor::new(
            engine,
            config,
            features,
            tx.downgrade(),
            Arc::clone(&states),
            events.clone(),
        );
        runtime.spawn(actor.run(rx));

        Ok(Self {
            commands: tx,
            states,
            events,
        })
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| PlaybackError::ManagerStopped)?;
        response.await.map_err(|_| PlaybackError::ManagerStopped)
    }

    // ------------------------------------------------------------------
    // Feed
    // ------------------------------------------------------------------

    /// Replace the feed list. Returns the number of items kept.
    pub async fn set_feed(&self, items: Vec<Item>) -> Result<usize> {
        self.request(|reply| Command::UpdateFeed {
            items,
            append: false,
            reply,
        })
        .await
    }

    /// Append a page to the feed. Returns the number of new items.
    pub async fn append_feed(&self, items: Vec<Item>) -> Result<usize> {
        self.request(|reply| Command::UpdateFeed {
            items,
            append: true,
            reply,
        })
        .await
    }

    // ------------------------------------------------------------------
    // UI contract
    // ------------------------------------------------------------------

    /// Report that `item_id` is now the single focused item.
    ///
    /// Pauses the previous item, plays this one once it is ready, warms its
    /// neighbours and evicts distant players.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::UnknownItem`] if the id is neither in the feed nor
    ///   previously acquired
    /// - [`PlaybackError::ManagerStopped`] if the manager is gone
    #[instrument(skip(self, item_id), fields(item_id = tracing::field::Empty))]
    pub async fn notify_focus(&self, item_id: impl Into<ItemId>) -> Result<()> {
        let item_id = item_id.into();
        tracing::Span::current().record("item_id", tracing::field::display(&item_id));
        self.request(|reply| Command::Focus { item_id, reply })
            .await?
    }

    /// Report that `item_id` left the retention window. Releases every
    /// resource and record held for it.
    #[instrument(skip(self, item_id), fields(item_id = tracing::field::Empty))]
    pub async fn notify_left_retention_window(&self, item_id: impl Into<ItemId>) -> Result<()> {
        let item_id = item_id.into();
        tracing::Span::current().record("item_id", tracing::field::display(&item_id));
        self.request(|reply| Command::LeftRetentionWindow { item_id, reply })
            .await
    }

    /// Get a handle for `item` to bind to a render surface.
    ///
    /// Reuses the active handle, promotes a preloaded one, or creates a new
    /// one in `Loading`. Resolves once the native session exists; a player
    /// that fails to open is reported through [`Self::current_error`], not
    /// as an `Err`.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn acquire_handle(&self, item: Item) -> Result<SurfaceBinding> {
        self.request(|reply| Command::Acquire { item, reply }).await
    }

    /// Warm `item_id` in the background without focusing it.
    pub async fn preload(&self, item_id: impl Into<ItemId>) -> Result<()> {
        let item_id = item_id.into();
        self.request(|reply| Command::Preload { item_id, reply })
            .await?
    }

    /// Playback state of the item; `Loading` when the manager has no record.
    pub fn current_state(&self, item_id: &ItemId) -> PlaybackState {
        self.states.read().state(item_id)
    }

    /// Last failure recorded for the item.
    pub fn current_error(&self, item_id: &ItemId) -> Option<ItemFailure> {
        self.states.read().error(item_id).cloned()
    }

    // ------------------------------------------------------------------
    // Explicit controls
    // ------------------------------------------------------------------

    pub async fn pause(&self, item_id: impl Into<ItemId>) -> Result<()> {
        let item_id = item_id.into();
        self.request(|reply| Command::Pause { item_id, reply }).await
    }

    /// Resume a paused or ready item. Failed items stay failed.
    pub async fn resume(&self, item_id: impl Into<ItemId>) -> Result<()> {
        let item_id = item_id.into();
        self.request(|reply| Command::Resume { item_id, reply }).await
    }

    /// Pause every active item except `except`.
    pub async fn pause_all(&self, except: Option<ItemId>) -> Result<()> {
        self.request(|reply| Command::PauseAll { except, reply })
            .await
    }

    /// Recreate a failed item's player now, whatever the failure kind.
    #[instrument(skip(self, item_id), fields(item_id = tracing::field::Empty))]
    pub async fn retry(&self, item_id: impl Into<ItemId>) -> Result<()> {
        let item_id = item_id.into();
        tracing::Span::current().record("item_id", tracing::field::display(&item_id));
        self.request(|reply| Command::Retry { item_id, reply }).await
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Apply a host lifecycle event and wait until it has been handled.
    pub async fn handle_lifecycle_event(&self, event: LifecycleEvent) -> Result<()> {
        self.request(|reply| Command::Lifecycle {
            event,
            reply: Some(reply),
        })
        .await
    }

    pub async fn notify_background(&self) -> Result<()> {
        self.handle_lifecycle_event(LifecycleEvent::EnteredBackground)
            .await
    }

    pub async fn notify_foreground(&self) -> Result<()> {
        self.handle_lifecycle_event(LifecycleEvent::EnteredForeground)
            .await
    }

    /// Drop every player and every per-item record.
    pub async fn notify_memory_pressure(&self) -> Result<()> {
        self.handle_lifecycle_event(LifecycleEvent::MemoryWarning)
            .await
    }

    /// Feed the observer's events into the manager until either side stops.
    pub fn attach_lifecycle_observer(&self, observer: Arc<dyn LifecycleObserver>) -> JoinHandle<()> {
        lifecycle::spawn_forwarder(observer, self.commands.downgrade())
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub async fn focused(&self) -> Result<Option<ItemId>> {
        self.request(|reply| Command::Focused { reply }).await
    }

    pub async fn snapshot(&self) -> Result<PoolSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Position recorded in the ledger for the item.
    pub async fn last_position(&self, item_id: impl Into<ItemId>) -> Result<Option<Duration>> {
        let item_id = item_id.into();
        self.request(|reply| Command::LastPosition { item_id, reply })
            .await
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Release every player and stop the manager task.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("stopped", &self.commands.is_closed())
            .field("tracked_items", &self.states.read().len())
            .finish()
    }
}
