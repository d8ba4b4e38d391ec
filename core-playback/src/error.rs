//! # Playback Error Types
//!
//! Two families of errors live here:
//!
//! - [`PlaybackError`]: the manager itself could not do what was asked
//!   (it has shut down, the configuration is invalid). These come back as `Err`.
//! - [`ItemFailure`]: one feed item's player broke. These are never returned
//!   from manager operations; they are recorded per item and queried through
//!   `PlaybackManager::current_error`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::ItemId;

/// Errors returned by manager operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The manager task is no longer running.
    #[error("Playback manager stopped")]
    ManagerStopped,

    /// The pool configuration failed validation.
    #[error("Invalid player pool configuration: {0}")]
    InvalidConfig(String),

    /// The focused id is not part of the feed.
    #[error("Item not in feed: {0}")]
    UnknownItem(ItemId),

    /// Runtime infrastructure error (configuration, missing runtime).
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// Host bridge error.
    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),
}

/// Result type for manager operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

// ============================================================================
// Item-scoped failures
// ============================================================================

/// Category of an item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Construction,
    Playback,
    Stall,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Construction => "construction",
            FailureKind::Playback => "playback",
            FailureKind::Stall => "stall",
        }
    }
}

/// Why an item's player entered the failed state.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemFailure {
    /// The player could not be created or the source could not be opened.
    #[error("Player construction failed: {0}")]
    Construction(String),

    /// The player became unplayable after it was ready.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Playback was interrupted before reaching the end of the media.
    #[error("Playback stalled: {0}")]
    Stall(String),
}

impl ItemFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ItemFailure::Construction(_) => FailureKind::Construction,
            ItemFailure::Playback(_) => FailureKind::Playback,
            ItemFailure::Stall(_) => FailureKind::Stall,
        }
    }

    /// Returns `true` if the manager recreates the player on its own when the
    /// failing item is focused.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ItemFailure::Construction(_) | ItemFailure::Stall(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ItemFailure::Construction(m) | ItemFailure::Playback(m) | ItemFailure::Stall(m) => m,
        }
    }
}
