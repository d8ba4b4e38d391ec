//! App Lifecycle Observation
//!
//! Reports host process transitions the playback core must react to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background
    Background,
    /// Application is being suspended
    Suspended,
}

/// Lifecycle transition or signal delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// App became active again
    EnteredForeground,
    /// App resigned active
    EnteredBackground,
    /// App is about to be suspended
    Suspended,
    /// The OS asked the process to free memory
    MemoryWarning,
}

impl LifecycleEvent {
    /// State the app is in after this event, if the event changes it.
    pub fn resulting_state(&self) -> Option<LifecycleState> {
        match self {
            LifecycleEvent::EnteredForeground => Some(LifecycleState::Foreground),
            LifecycleEvent::EnteredBackground => Some(LifecycleState::Background),
            LifecycleEvent::Suspended => Some(LifecycleState::Suspended),
            LifecycleEvent::MemoryWarning => None,
        }
    }
}

/// Lifecycle observer trait
///
/// Notifies the core about app lifecycle transitions so it can:
/// - Pause every player when backgrounded
/// - Resume the focused item when foregrounded
/// - Drop all decode resources under memory pressure
///
/// # Platform Support
///
/// - **iOS**: `willResignActive` / `didBecomeActive` / `didReceiveMemoryWarning`
/// - **Android**: Activity lifecycle callbacks and `onTrimMemory`
/// - **Web**: Page Visibility API
///
/// # Example
///
/// ```ignore
/// use bridge_traits::lifecycle::{LifecycleEvent, LifecycleObserver};
///
/// async fn watch(observer: &dyn LifecycleObserver) -> Result<()> {
///     let mut stream = observer.subscribe().await?;
///
///     while let Some(event) = stream.next().await {
///         match event {
///             LifecycleEvent::EnteredBackground => pause_all(),
///             LifecycleEvent::MemoryWarning => flush(),
///             _ => {}
///         }
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get current lifecycle state
    async fn get_state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle events
    async fn subscribe(&self) -> Result<Box<dyn LifecycleEventStream>>;
}

/// Stream of lifecycle events
#[async_trait]
pub trait LifecycleEventStream: Send {
    /// Get the next lifecycle event
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleEvent>;
}
