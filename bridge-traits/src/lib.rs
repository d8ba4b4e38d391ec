//! # Host Bridge Traits
//!
//! Capabilities the feed playback core needs from the host platform.
//!
//! ## Overview
//!
//! The core owns every decision about which feed items hold decode resources,
//! but it never touches a decoder itself. Each host (iOS, Android, desktop,
//! web) implements the traits below and hands them to the core at bootstrap.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaEngine`](media::MediaEngine) - Allocate native playback sessions and drive transport
//! - [`MediaSignalStream`](media::MediaSignalStream) - Per-session readiness, failure and end signals
//!
//! ### Platform Integration
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - Foreground/background transitions and memory warnings
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start when a required capability is missing:
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .media_engine(engine)
//!     .build()?; // Error::CapabilityMissing without an engine
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so the core can call them from any
//! task on its runtime.
//!
//! ## Testing
//!
//! The `mock` feature provides [`MockMediaEngine`](mock::MockMediaEngine) and
//! [`MockLifecycleObserver`](mock::MockLifecycleObserver), in-memory hosts
//! whose signals are scripted by the test.

pub mod error;
pub mod lifecycle;
pub mod log;
pub mod media;

#[cfg(feature = "mock")]
pub mod mock;

pub use error::{BridgeError, Result};
pub use lifecycle::{LifecycleEvent, LifecycleEventStream, LifecycleObserver, LifecycleState};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    MediaEngine, MediaOptions, MediaRequest, MediaSessionId, MediaSignal, MediaSignalStream,
    MediaSource,
};
