//! Media engine bridge traits and supporting types.
//!
//! A [`MediaEngine`] is the host's native decoder/renderer (AVPlayer, ExoPlayer,
//! an `<video>` element, a GStreamer pipeline). The core never decodes frames
//! itself: it asks the engine for sessions, issues transport commands against
//! them, and listens to each session's [`MediaSignalStream`]. Commands are
//! expected to return promptly; anything that waits on the network or decoder
//! is reported later through signals.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Identifier of one native playback session owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaSessionId(Uuid);

impl MediaSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of the media the engine should open (HLS master playlist,
/// progressive MP4, local file URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
}

impl MediaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Options applied when a session is prepared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaOptions {
    /// Start playing as soon as the session is ready.
    pub autoplay: bool,
    /// Hint for engines to buffer this far ahead before reporting readiness.
    pub prebuffer_duration: Duration,
    /// Mute audio output (feeds typically start muted while warming).
    pub muted: bool,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            prebuffer_duration: Duration::from_millis(500),
            muted: false,
        }
    }
}

/// Request describing the session an engine should provision.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub source: MediaSource,
    pub options: MediaOptions,
}

impl MediaRequest {
    pub fn new(source: MediaSource) -> Self {
        Self {
            source,
            options: MediaOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MediaOptions) -> Self {
        self.options = options;
        self
    }
}

/// Lifecycle notification emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSignal {
    /// The session can start rendering.
    ReadyToPlay,
    /// The session hit a fatal decode or stream error.
    Failed { message: String },
    /// Playback was interrupted before reaching the end of the media.
    FailedToPlayToEnd { message: String },
    /// Playback reached the natural end of the media.
    PlayedToEnd,
    /// Playback is waiting on data; not fatal.
    Stalled,
}

/// Stream of signals for a single session.
#[async_trait]
pub trait MediaSignalStream: Send {
    /// Get the next signal.
    ///
    /// Returns `None` once the session has been released.
    async fn next(&mut self) -> Option<MediaSignal>;
}

/// Host media engine.
///
/// # Contract
///
/// - `prepare` allocates native resources and returns without waiting for the
///   source to become playable.
/// - `subscribe` may be called several times for the same session. Each new
///   stream first replays the session's current readiness (`ReadyToPlay` or
///   `Failed`) when one is known, then follows live signals.
/// - After `release` every call naming the session fails with
///   [`BridgeError::SessionNotFound`](crate::BridgeError::SessionNotFound) and
///   all of its streams end.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Allocate a session for the request.
    async fn prepare(&self, request: MediaRequest) -> Result<MediaSessionId>;

    /// Subscribe to the session's lifecycle signals.
    async fn subscribe(&self, session: MediaSessionId) -> Result<Box<dyn MediaSignalStream>>;

    /// Begin or resume playback.
    async fn play(&self, session: MediaSessionId) -> Result<()>;

    /// Pause playback without releasing the session.
    async fn pause(&self, session: MediaSessionId) -> Result<()>;

    /// Seek to an absolute position with zero tolerance.
    async fn seek(&self, session: MediaSessionId, position: Duration) -> Result<()>;

    /// Query the current playback position.
    async fn position(&self, session: MediaSessionId) -> Result<Duration>;

    /// Release every native resource held by the session.
    async fn release(&self, session: MediaSessionId) -> Result<()>;
}
