//! # Playback Resource Manager
//!
//! Keeps a bounded set of native players alive around the focused item of a
//! scrolling video feed.
//!
//! ## Overview
//!
//! This crate handles:
//! - Promoting, creating and evicting per-item players ([`PlaybackManager`])
//! - Warming the focused item's neighbours in the background
//! - The observable per-item state machine ([`PlaybackState`])
//! - Remembering playback positions across player lifetimes
//! - Recreating failed players after a fixed delay
//! - Reacting to host lifecycle and memory pressure signals
//!
//! The native player itself is a host concern, reached through
//! [`bridge_traits::MediaEngine`].

pub mod config;
pub mod error;
pub mod feed;
pub mod item;
pub mod manager;
pub mod state;

mod handle;
mod lifecycle;
mod pool;
mod recovery;

pub use config::PlayerPoolConfig;
pub use error::{FailureKind, ItemFailure, PlaybackError, Result};
pub use feed::FeedList;
pub use handle::HandleId;
pub use item::{FeedManifest, Item, ItemId};
pub use manager::{PlaybackManager, PoolSnapshot, SurfaceBinding};
pub use state::{PlaybackState, PositionLedger, StateStore};
