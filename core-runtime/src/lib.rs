//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the feed playback crates:
//! - Logging and tracing setup
//! - Bootstrap configuration with fail-fast bridge validation
//! - Event bus for observers of playback activity
//!
//! ## Overview
//!
//! Nothing in here knows how a player works. This crate wires the host's
//! bridges together, decides where log output goes, and carries events from
//! the playback manager to whoever subscribes.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
