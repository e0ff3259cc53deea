//! Playback session walkthrough
//!
//! Drives a session against an in-process media engine that is ready
//! immediately, printing every state change and bus event.
//!
//! Run with:
//! ```bash
//! cargo run -p core-playback --example session_demo
//!
//! # JSON logs
//! cargo run -p core-playback --example session_demo -- json
//! ```

use std::env;
use std::sync::Arc;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    Item, LogLevel, MediaEngine, MediaHandle, MediaKind, MediaObserver, MediaStatus, MediaTime,
    MediaTrack, NoopAudioSession, SeekCompletion, TimeRange,
};
use core_playback::{MemoryTimeStore, PlaybackEngine, PlaybackState};
use core_runtime::events::EventStream;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::{EventBus, PlaybackConfig};
use parking_lot::Mutex;
use tracing::info;

/// Handle that reports ready as soon as an observer attaches.
struct InstantHandle {
    locator: String,
    rate: Mutex<f32>,
    time: Mutex<MediaTime>,
    observers: Mutex<Vec<Arc<dyn MediaObserver>>>,
}

impl InstantHandle {
    fn notify_rate(&self, rate: f32) {
        *self.rate.lock() = rate;
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer.rate_changed(rate);
        }
    }
}

impl MediaHandle for InstantHandle {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn status(&self) -> MediaStatus {
        MediaStatus::ReadyToPlay
    }

    fn play(&self) {
        self.notify_rate(1.0);
    }

    fn pause(&self) {
        self.notify_rate(0.0);
    }

    fn seek(&self, position: MediaTime, on_complete: SeekCompletion) {
        *self.time.lock() = position;
        on_complete(true);
    }

    fn cancel_pending_seeks(&self) {}

    fn current_time(&self) -> MediaTime {
        *self.time.lock()
    }

    fn duration(&self) -> Option<MediaTime> {
        Some(MediaTime::from_seconds(1800.0))
    }

    fn rate(&self) -> f32 {
        *self.rate.lock()
    }

    fn seekable_ranges(&self) -> Vec<TimeRange> {
        vec![TimeRange::new(MediaTime::ZERO, MediaTime::from_seconds(1800.0))]
    }

    fn tracks(&self) -> Option<Vec<MediaTrack>> {
        Some(vec![MediaTrack::audio()])
    }

    fn attach_observer(&self, observer: Arc<dyn MediaObserver>) {
        self.observers.lock().push(Arc::clone(&observer));
        observer.status_changed(MediaStatus::ReadyToPlay);
    }

    fn detach_observers(&self) {
        self.observers.lock().clear();
    }
}

struct InstantEngine;

impl MediaEngine for InstantEngine {
    fn load(&self, locator: &str) -> BridgeResult<Arc<dyn MediaHandle>> {
        Ok(Arc::new(InstantHandle {
            locator: locator.to_string(),
            rate: Mutex::new(0.0),
            time: Mutex::new(MediaTime::ZERO),
            observers: Mutex::new(Vec::new()),
        }))
    }
}

#[tokio::main]
async fn main() {
    let format = match env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug),
    )
    .expect("Failed to initialize logging");

    let bus = EventBus::default();
    let mut events = EventStream::new(bus.subscribe());
    let store = MemoryTimeStore::new();

    let config = PlaybackConfig::builder()
        .media_engine(Arc::new(InstantEngine))
        .time_store(Arc::new(store.clone()))
        .audio_session(Arc::new(NoopAudioSession))
        .event_bus(bus)
        .build()
        .expect("demo config is complete");

    let handle = PlaybackEngine::new(config)
        .with_state_observer(Arc::new(|state: &PlaybackState| {
            info!(state = %state, "Observer notified");
        }))
        .spawn()
        .expect("running inside tokio");

    let episode = Item::new(
        "ep-42",
        "https://cdn.example.com/shows/42.mp3?token=secret",
        MediaKind::Audio,
    )
    .with_title("Episode 42");

    handle.change_item(Some(episode), true);
    info!(state = %handle.settled_state().await, "Started");

    handle.scrub(MediaTime::from_seconds(600.0));
    handle.pause();
    info!(state = %handle.settled_state().await, "Paused after scrubbing");

    handle.shutdown().await;

    while let Some(Ok(event)) = events.try_recv() {
        info!(severity = ?event.severity(), "{}", event.description());
    }

    match store.to_json() {
        Ok(json) => info!(timestamps = %json, "Stored resume positions"),
        Err(err) => info!(error = %err, "Could not export timestamps"),
    }
}
