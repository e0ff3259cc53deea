//! Workspace facade crate.
//!
//! Re-exports the workspace crates so hosts can depend on
//! `playback-session` alone. The `engine` feature (on by default) pulls in
//! `core-playback`; hosts that only implement the bridge traits can turn it
//! off and keep `bridge-traits` plus `core-runtime`.

pub use bridge_traits;
pub use core_runtime;

#[cfg(feature = "engine")]
pub use core_playback;

#[cfg(feature = "engine")]
pub use core_playback::{PlaybackEngine, PlaybackHandle, PlaybackState};
