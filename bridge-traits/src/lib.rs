//! # Host Bridge Traits
//!
//! Contracts between the playback core and the collaborators a host
//! platform supplies.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaEngine`](playback::MediaEngine) / [`MediaHandle`](playback::MediaHandle) -
//!   loads one locator at a time and exposes transport controls
//! - [`MediaObserver`](playback::MediaObserver) - asynchronous status signals
//!   from a handle
//!
//! ### Session & Persistence
//! - [`AudioSession`](session::AudioSession) - platform audio session
//! - [`LocatorProxy`](session::LocatorProxy) - item to loadable locator
//! - [`TimeStore`](storage::TimeStore) - resume positions per item
//!
//! ### Presentation
//! - [`NowPlayingPublisher`](playback::NowPlayingPublisher) - OS now-playing info
//! - [`QueueNavigator`](playback::QueueNavigator) - next/previous items
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - time source for deterministic testing
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Fallible bridge calls return [`BridgeError`](error::BridgeError).
//! Implementations should map platform errors onto the closest variant;
//! the engine distinguishes `Unreachable` and `UnsupportedMedia` from
//! generic failures.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Which methods may block is documented
//! per trait; everything else is called from the playback executor and must
//! return promptly.

pub mod error;
pub mod logging;
pub mod playback;
pub mod session;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    HandleId, Item, ItemId, MediaEngine, MediaHandle, MediaKind, MediaObserver, MediaStatus,
    MediaTrack, NowPlayingInfo, NowPlayingPublisher, QueueNavigator, SeekCompletion, TrackKind,
};
pub use session::{AudioSession, DirectLocator, LocatorProxy, NoopAudioSession};
pub use storage::{TimeStore, Timestamp, TimestampTag};
pub use time::{Clock, MediaTime, SystemClock, TimeRange, PREFERRED_TIMESCALE};
