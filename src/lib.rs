//! Workspace umbrella crate.
//!
//! Re-exports the feed player crates behind the `player` feature so host
//! applications can depend on `reelfeed` alone. Enable `mock-engine` to pull
//! in the scriptable media engine for demos and host-side tests.

#[cfg(feature = "player")]
pub use bridge_traits;
#[cfg(feature = "player")]
pub use core_playback;
#[cfg(feature = "player")]
pub use core_runtime;
