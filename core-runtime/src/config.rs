//! # Core Configuration Module
//!
//! Bootstrap configuration for the feed playback core.
//!
//! ## Overview
//!
//! A `CoreConfig` carries the host bridges the core runs against and the
//! switches for optional behavior. It is built with [`CoreConfigBuilder`],
//! which fails fast when a required bridge is missing so that a host forgetting
//! to inject its media engine finds out at startup, not on the first scroll.
//!
//! ## Required Dependencies
//!
//! - `MediaEngine` - Native decoder/renderer behind every playback handle
//!
//! ## Optional Dependencies
//!
//! - `LifecycleObserver` - Background/foreground and memory warnings
//!   (required once `enable_lifecycle_handling` is on)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_engine(Arc::new(MyAvPlayerEngine::new()))
//!     .lifecycle_observer(Arc::new(MyAppDelegateObserver::new()))
//!     .enable_lifecycle_handling(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: no MediaEngine was injected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("missing media engine");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{LifecycleObserver, MediaEngine};
use std::sync::Arc;

/// Largest event buffer accepted by [`CoreConfig::validate`].
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Core configuration for the feed playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native media engine (required)
    pub media_engine: Arc<dyn MediaEngine>,

    /// App lifecycle observer (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Feature flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_engine", &"MediaEngine { ... }")
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behavior of the playback core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Warm the neighbors of the focused item in the background
    pub enable_neighbor_preload: bool,

    /// Recreate the focused item's player after a recoverable failure
    pub enable_auto_recovery: bool,

    /// React to host lifecycle signals (requires LifecycleObserver)
    pub enable_lifecycle_handling: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_neighbor_preload: true,
            enable_auto_recovery: true,
            enable_lifecycle_handling: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Checks the event buffer bounds and that every enabled feature has the
    /// bridge it needs.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_lifecycle_handling && self.lifecycle_observer.is_none() {
            return Err(Error::Config(
                "Lifecycle handling enabled but no LifecycleObserver provided. \
                 Disable the feature or inject a LifecycleObserver implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn media_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "MediaEngine implementation is required to create playback handles. \
                 iOS: inject an AVPlayer-backed engine. \
                 Android: inject an ExoPlayer-backed engine. \
                 Tests: enable the 'mock' feature of bridge-traits and use MockMediaEngine."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_engine: Option<Arc<dyn MediaEngine>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the media engine implementation (required).
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_neighbor_preload(mut self, enabled: bool) -> Self {
        self.features.enable_neighbor_preload = enabled;
        self
    }

    pub fn enable_auto_recovery(mut self, enabled: bool) -> Self {
        self.features.enable_auto_recovery = enabled;
        self
    }

    pub fn enable_lifecycle_handling(mut self, enabled: bool) -> Self {
        self.features.enable_lifecycle_handling = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `MediaEngine` was provided
    /// - [`Error::Config`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let media_engine = self.media_engine.ok_or_else(media_engine_missing_error)?;

        let config = CoreConfig {
            media_engine,
            lifecycle_observer: self.lifecycle_observer,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
