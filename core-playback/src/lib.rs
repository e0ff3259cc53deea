//! # Playback Session Module
//!
//! The playback session state machine and the policies around it.
//!
//! ## Overview
//!
//! This module handles:
//! - The session states and the events that move between them
//! - Resume position arithmetic and persistence decisions
//! - Publishing now-playing snapshots
//! - Serializing commands and media engine callbacks through one executor
//!
//! Decoding, rendering and storage live behind the traits in
//! `bridge-traits`; see [`PlaybackEngine`] for how they are wired together.

pub mod engine;
pub mod error;
pub mod event;
pub mod now_playing;
pub mod policy;
pub mod state;
pub mod time_store;

pub use engine::{PlaybackEngine, PlaybackHandle};
pub use error::{EngineFault, PlaybackError};
pub use event::PlaybackEvent;
pub use policy::{ResumePolicy, TimestampDecision, TimestampPolicy};
pub use state::{AssetSnapshot, HandleRef, PlaybackState, StateObserver};
pub use time_store::MemoryTimeStore;
