//! # Playback Configuration
//!
//! Builder-based configuration for the playback engine.
//!
//! ## Overview
//!
//! [`PlaybackConfig`] holds every collaborator the engine talks to plus the
//! tunables of the resume and timestamp policies. Collaborators are injected
//! explicitly; the builder fails fast when a required one is missing.
//!
//! ## Required Dependencies
//!
//! - `MediaEngine` - loads locators into media handles
//! - `TimeStore` - resume positions per item
//! - `AudioSession` - platform audio session (use `NoopAudioSession` on hosts
//!   without one)
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `LocatorProxy` - defaults to `DirectLocator`
//! - `Clock` - defaults to `SystemClock`
//! - `NowPlayingPublisher`, `QueueNavigator`, `EventBus` - absent by default
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PlaybackConfig;
//! use std::sync::Arc;
//!
//! let config = PlaybackConfig::builder()
//!     .media_engine(Arc::new(MyEngine::new()))
//!     .time_store(Arc::new(MemoryTimeStore::default()))
//!     .audio_session(Arc::new(NoopAudioSession))
//!     .resume_lookback_secs(5.0)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{
    AudioSession, Clock, DirectLocator, LocatorProxy, MediaEngine, MediaTime,
    NowPlayingPublisher, QueueNavigator, SystemClock, TimeStore,
};
use std::sync::Arc;

/// Seconds rewound from the stored position when resuming.
pub const DEFAULT_RESUME_LOOKBACK_SECS: f64 = 5.0;

/// Distance from either end of an item inside which positions are not
/// stored as resume points.
pub const DEFAULT_FINISHED_MARGIN_SECS: f64 = 15.0;

/// Tunables of the playback policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTuning {
    /// Subtracted from the stored position before seeking on resume.
    pub resume_lookback: MediaTime,
    /// Positions closer than this to the start clear the timestamp;
    /// positions at least this close to the end mark the item finished.
    pub finished_margin: MediaTime,
    /// Panic on an internal invariant violation instead of forcing the
    /// session inactive. Defaults to `true` in debug builds only.
    pub abort_on_invariant_violation: bool,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            resume_lookback: MediaTime::from_seconds(DEFAULT_RESUME_LOOKBACK_SECS),
            finished_margin: MediaTime::from_seconds(DEFAULT_FINISHED_MARGIN_SECS),
            abort_on_invariant_violation: cfg!(debug_assertions),
        }
    }
}

/// Configuration for the playback engine.
///
/// Use [`PlaybackConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct PlaybackConfig {
    pub media_engine: Arc<dyn MediaEngine>,

    pub time_store: Arc<dyn TimeStore>,

    pub audio_session: Arc<dyn AudioSession>,

    pub locator_proxy: Arc<dyn LocatorProxy>,

    pub clock: Arc<dyn Clock>,

    pub now_playing: Option<Arc<dyn NowPlayingPublisher>>,

    pub navigator: Option<Arc<dyn QueueNavigator>>,

    /// Bus receiving session and timestamp notifications.
    pub event_bus: Option<EventBus>,

    pub tuning: PlaybackTuning,
}

impl std::fmt::Debug for PlaybackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackConfig")
            .field("media_engine", &"MediaEngine { ... }")
            .field("time_store", &"TimeStore { ... }")
            .field("audio_session", &"AudioSession { ... }")
            .field("locator_proxy", &"LocatorProxy { ... }")
            .field(
                "now_playing",
                &self
                    .now_playing
                    .as_ref()
                    .map(|_| "NowPlayingPublisher { ... }"),
            )
            .field(
                "navigator",
                &self.navigator.as_ref().map(|_| "QueueNavigator { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl PlaybackConfig {
    pub fn builder() -> PlaybackConfigBuilder {
        PlaybackConfigBuilder::default()
    }

    /// Validates the tunables.
    ///
    /// Both margins must be valid, non-negative times, and the finished
    /// margin must be strictly positive so a zero position is never stored.
    pub fn validate(&self) -> Result<()> {
        let PlaybackTuning {
            resume_lookback,
            finished_margin,
            ..
        } = self.tuning;

        if !resume_lookback.is_valid() || resume_lookback < MediaTime::ZERO {
            return Err(Error::Config(format!(
                "Resume lookback must be a non-negative time, got {}",
                resume_lookback
            )));
        }

        if !finished_margin.is_valid() || finished_margin <= MediaTime::ZERO {
            return Err(Error::Config(format!(
                "Finished margin must be a positive time, got {}",
                finished_margin
            )));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for constructing [`PlaybackConfig`] instances.
#[derive(Default)]
pub struct PlaybackConfigBuilder {
    media_engine: Option<Arc<dyn MediaEngine>>,
    time_store: Option<Arc<dyn TimeStore>>,
    audio_session: Option<Arc<dyn AudioSession>>,
    locator_proxy: Option<Arc<dyn LocatorProxy>>,
    clock: Option<Arc<dyn Clock>>,
    now_playing: Option<Arc<dyn NowPlayingPublisher>>,
    navigator: Option<Arc<dyn QueueNavigator>>,
    event_bus: Option<EventBus>,
    tuning: PlaybackTuning,
}

impl PlaybackConfigBuilder {
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    pub fn time_store(mut self, store: Arc<dyn TimeStore>) -> Self {
        self.time_store = Some(store);
        self
    }

    pub fn audio_session(mut self, session: Arc<dyn AudioSession>) -> Self {
        self.audio_session = Some(session);
        self
    }

    pub fn locator_proxy(mut self, proxy: Arc<dyn LocatorProxy>) -> Self {
        self.locator_proxy = Some(proxy);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn now_playing(mut self, publisher: Arc<dyn NowPlayingPublisher>) -> Self {
        self.now_playing = Some(publisher);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn QueueNavigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn resume_lookback_secs(mut self, seconds: f64) -> Self {
        self.tuning.resume_lookback = MediaTime::from_seconds(seconds);
        self
    }

    pub fn finished_margin_secs(mut self, seconds: f64) -> Self {
        self.tuning.finished_margin = MediaTime::from_seconds(seconds);
        self
    }

    pub fn abort_on_invariant_violation(mut self, abort: bool) -> Self {
        self.tuning.abort_on_invariant_violation = abort;
        self
    }

    pub fn tuning(mut self, tuning: PlaybackTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Builds the final `PlaybackConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when `MediaEngine`, `TimeStore` or
    ///   `AudioSession` was not provided
    /// - [`Error::Config`] when a tunable is out of range
    pub fn build(self) -> Result<PlaybackConfig> {
        let media_engine = self.media_engine.ok_or_else(|| {
            capability_missing(
                "MediaEngine",
                "A MediaEngine is required to load media. \
                 Inject the platform media framework adapter with .media_engine().",
            )
        })?;

        let time_store = self.time_store.ok_or_else(|| {
            capability_missing(
                "TimeStore",
                "A TimeStore is required to persist resume positions. \
                 Use MemoryTimeStore for ephemeral sessions.",
            )
        })?;

        let audio_session = self.audio_session.ok_or_else(|| {
            capability_missing(
                "AudioSession",
                "An AudioSession is required to activate audio output. \
                 Hosts without an audio session concept can inject NoopAudioSession.",
            )
        })?;

        let config = PlaybackConfig {
            media_engine,
            time_store,
            audio_session,
            locator_proxy: self
                .locator_proxy
                .unwrap_or_else(|| Arc::new(DirectLocator)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            now_playing: self.now_playing,
            navigator: self.navigator,
            event_bus: self.event_bus,
            tuning: self.tuning,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ItemId, MediaHandle, NoopAudioSession, Timestamp};
    use mockall::mock;

    mock! {
        pub Engine {}

        impl MediaEngine for Engine {
            fn load(&self, locator: &str) -> BridgeResult<Arc<dyn MediaHandle>>;
        }
    }

    mock! {
        pub Store {}

        impl TimeStore for Store {
            fn time(&self, id: &ItemId) -> Option<MediaTime>;
            fn set(&self, id: &ItemId, timestamp: Timestamp);
            fn remove(&self, id: &ItemId);
            fn is_unplayed(&self, id: &ItemId) -> bool;
        }
    }

    fn complete_builder() -> PlaybackConfigBuilder {
        PlaybackConfig::builder()
            .media_engine(Arc::new(MockEngine::new()))
            .time_store(Arc::new(MockStore::new()))
            .audio_session(Arc::new(NoopAudioSession))
    }

    #[test]
    fn test_builder_requires_media_engine() {
        let result = PlaybackConfig::builder()
            .time_store(Arc::new(MockStore::new()))
            .audio_session(Arc::new(NoopAudioSession))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("MediaEngine"));
    }

    #[test]
    fn test_builder_requires_time_store() {
        let result = PlaybackConfig::builder()
            .media_engine(Arc::new(MockEngine::new()))
            .audio_session(Arc::new(NoopAudioSession))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "TimeStore"
        ));
    }

    #[test]
    fn test_builder_requires_audio_session() {
        let result = PlaybackConfig::builder()
            .media_engine(Arc::new(MockEngine::new()))
            .time_store(Arc::new(MockStore::new()))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("AudioSession"));
        assert!(err_msg.contains("NoopAudioSession"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.tuning.resume_lookback, MediaTime::from_seconds(5.0));
        assert_eq!(config.tuning.finished_margin, MediaTime::from_seconds(15.0));
        assert_eq!(
            config.tuning.abort_on_invariant_violation,
            cfg!(debug_assertions)
        );
        assert!(config.now_playing.is_none());
        assert!(config.navigator.is_none());
        assert!(config.event_bus.is_none());
    }

    #[test]
    fn test_builder_custom_tuning() {
        let config = complete_builder()
            .resume_lookback_secs(10.0)
            .finished_margin_secs(30.0)
            .abort_on_invariant_violation(false)
            .build()
            .unwrap();

        assert_eq!(config.tuning.resume_lookback, MediaTime::from_seconds(10.0));
        assert_eq!(config.tuning.finished_margin, MediaTime::new(30, 1));
        assert!(!config.tuning.abort_on_invariant_violation);
    }

    #[test]
    fn test_zero_lookback_is_allowed() {
        assert!(complete_builder().resume_lookback_secs(0.0).build().is_ok());
    }

    #[test]
    fn test_negative_lookback_is_rejected() {
        let err = complete_builder()
            .resume_lookback_secs(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Resume lookback"));
    }

    #[test]
    fn test_non_finite_margin_is_rejected() {
        let err = complete_builder()
            .finished_margin_secs(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = complete_builder()
            .finished_margin_secs(0.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Finished margin"));
    }

    #[test]
    fn test_debug_hides_collaborators() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("MediaEngine { ... }"));
        assert!(debug.contains("tuning"));
    }
}
