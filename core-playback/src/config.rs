//! # Player Pool Configuration
//!
//! Bounds and timings for the playback resource manager.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player pool configuration.
///
/// Controls how many players stay alive, how far ahead the feed is warmed,
/// and how quickly failures are retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPoolConfig {
    /// Maximum number of promoted players kept alive.
    ///
    /// Preloaded players do not count against this bound.
    ///
    /// Default: 5.
    #[serde(default = "default_max_active_players")]
    pub max_active_players: usize,

    /// How many items on each side of the focused item are warmed.
    ///
    /// Default: 1 (the previous and the next item).
    #[serde(default = "default_preload_radius")]
    pub preload_radius: usize,

    /// Fixed delay before a failed focused item is recreated.
    ///
    /// Default: 1 second.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// How often a player's position is sampled into the position ledger.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_position_sample_interval")]
    pub position_sample_interval: Duration,

    /// Maximum number of players being warmed at the same time.
    ///
    /// Default: 2.
    #[serde(default = "default_max_concurrent_preloads")]
    pub max_concurrent_preloads: usize,

    /// Maximum time the engine may take to allocate a player.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_prepare_timeout")]
    pub prepare_timeout: Duration,

    /// Capacity of the manager's command channel.
    ///
    /// Default: 64.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Publish `EndApproaching` when fewer than this many items follow the
    /// focused one.
    ///
    /// Default: 3.
    #[serde(default = "default_end_approach_threshold")]
    pub end_approach_threshold: usize,
}

impl Default for PlayerPoolConfig {
    fn default() -> Self {
        Self {
            max_active_players: default_max_active_players(),
            preload_radius: default_preload_radius(),
            retry_delay: default_retry_delay(),
            position_sample_interval: default_position_sample_interval(),
            max_concurrent_preloads: default_max_concurrent_preloads(),
            prepare_timeout: default_prepare_timeout(),
            command_buffer: default_command_buffer(),
            end_approach_threshold: default_end_approach_threshold(),
        }
    }
}

impl PlayerPoolConfig {
    /// Configuration for memory-constrained devices.
    ///
    /// - Three live players
    /// - One preload at a time
    pub fn low_memory() -> Self {
        Self {
            max_active_players: 3,
            max_concurrent_preloads: 1,
            ..Default::default()
        }
    }

    /// Configuration for fast connections and fast flinging.
    ///
    /// - Eight live players
    /// - Two items warmed on each side
    /// - Earlier next-page trigger
    pub fn aggressive_prefetch() -> Self {
        Self {
            max_active_players: 8,
            preload_radius: 2,
            max_concurrent_preloads: 4,
            end_approach_threshold: 5,
            ..Default::default()
        }
    }

    pub fn with_max_active_players(mut self, max: usize) -> Self {
        self.max_active_players = max;
        self
    }

    pub fn with_preload_radius(mut self, radius: usize) -> Self {
        self.preload_radius = radius;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_position_sample_interval(mut self, interval: Duration) -> Self {
        self.position_sample_interval = interval;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_active_players == 0 {
            return Err("max_active_players must be > 0".to_string());
        }

        if self.max_concurrent_preloads == 0 {
            return Err("max_concurrent_preloads must be > 0".to_string());
        }

        if self.position_sample_interval.is_zero() {
            return Err("position_sample_interval must be > 0".to_string());
        }

        if self.prepare_timeout.is_zero() {
            return Err("prepare_timeout must be > 0".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_max_active_players() -> usize {
    5
}

fn default_preload_radius() -> usize {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_position_sample_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_max_concurrent_preloads() -> usize {
    2
}

fn default_prepare_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_command_buffer() -> usize {
    64
}

fn default_end_approach_threshold() -> usize {
    3
}
