//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration and collaborator injection
//! - Event bus for session and timestamp notifications
//!
//! ## Overview
//!
//! The playback engine takes everything it talks to through
//! [`PlaybackConfig`](config::PlaybackConfig); there is no process-wide
//! state besides the tracing subscriber installed by
//! [`init_logging`](logging::init_logging).

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{PlaybackConfig, PlaybackConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, SessionEvent, TimestampEvent};
