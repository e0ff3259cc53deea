//! Scripted collaborators for engine tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, Clock, Item, ItemId, MediaEngine, MediaHandle, MediaKind, MediaObserver,
    MediaStatus, MediaTime, MediaTrack, NoopAudioSession, NowPlayingInfo, NowPlayingPublisher,
    QueueNavigator, SeekCompletion, TimeRange,
};
use chrono::{DateTime, TimeZone, Utc};
use core_playback::{MemoryTimeStore, PlaybackEngine, PlaybackHandle, PlaybackState, StateObserver};
use core_runtime::config::PlaybackConfigBuilder;
use core_runtime::{EventBus, PlaybackConfig};
use parking_lot::Mutex;

pub fn secs(seconds: f64) -> MediaTime {
    MediaTime::from_seconds(seconds)
}

pub fn episode(id: &str) -> Item {
    Item::new(id, locator(id), MediaKind::Audio).with_title(format!("Episode {}", id))
}

pub fn locator(id: &str) -> String {
    format!("https://cdn.example.com/{}.mp3", id)
}

// ============================================================================
// Fake media engine
// ============================================================================

/// How a handle behaves right after it is loaded.
#[derive(Clone, Debug)]
pub struct HandleScript {
    pub status: MediaStatus,
    pub tracks: Option<Vec<MediaTrack>>,
    pub duration: Option<MediaTime>,
    pub ranges: Vec<TimeRange>,
    /// Keep seek completions pending until `complete_seek` is called.
    pub defer_seeks: bool,
}

impl Default for HandleScript {
    fn default() -> Self {
        Self {
            status: MediaStatus::ReadyToPlay,
            tracks: Some(vec![MediaTrack::audio()]),
            duration: Some(secs(3600.0)),
            ranges: Vec::new(),
            defer_seeks: false,
        }
    }
}

impl HandleScript {
    pub fn pending() -> Self {
        Self {
            status: MediaStatus::Unknown,
            tracks: None,
            ..Self::default()
        }
    }

    pub fn video() -> Self {
        Self {
            tracks: Some(vec![MediaTrack::audio(), MediaTrack::video()]),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: Option<MediaTime>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_tracks(mut self, tracks: Option<Vec<MediaTrack>>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_ranges(mut self, ranges: Vec<TimeRange>) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn deferring_seeks(mut self) -> Self {
        self.defer_seeks = true;
        self
    }
}

#[derive(Default)]
struct EngineState {
    scripts: HashMap<String, HandleScript>,
    failures: HashMap<String, fn(String) -> BridgeError>,
    handles: Vec<Arc<FakeHandle>>,
}

/// Media engine handing out [`FakeHandle`]s according to per-locator scripts.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, locator: impl Into<String>, script: HandleScript) {
        self.state.lock().scripts.insert(locator.into(), script);
    }

    pub fn fail_loads(&self, locator: impl Into<String>, error: fn(String) -> BridgeError) {
        self.state.lock().failures.insert(locator.into(), error);
    }

    pub fn handles(&self) -> Vec<Arc<FakeHandle>> {
        self.state.lock().handles.clone()
    }

    pub fn load_count(&self) -> usize {
        self.state.lock().handles.len()
    }

    pub fn last_handle(&self) -> Arc<FakeHandle> {
        self.state
            .lock()
            .handles
            .last()
            .cloned()
            .expect("no media loaded yet")
    }
}

impl MediaEngine for FakeEngine {
    fn load(&self, locator: &str) -> BridgeResult<Arc<dyn MediaHandle>> {
        let mut state = self.state.lock();
        if let Some(error) = state.failures.get(locator) {
            return Err(error(format!("cannot load {}", locator)));
        }
        let script = state.scripts.get(locator).cloned().unwrap_or_default();
        let handle = Arc::new(FakeHandle::new(locator, script));
        state.handles.push(Arc::clone(&handle));
        Ok(handle)
    }
}

struct HandleState {
    status: MediaStatus,
    tracks: Option<Vec<MediaTrack>>,
    duration: Option<MediaTime>,
    ranges: Vec<TimeRange>,
    rate: f32,
    time: MediaTime,
    defer_seeks: bool,
    pending_seek: Option<SeekCompletion>,
    seeks: Vec<MediaTime>,
    play_calls: usize,
    pause_calls: usize,
    observers: Vec<Arc<dyn MediaObserver>>,
    ever_attached: usize,
}

/// Scripted media handle. Transport calls notify observers synchronously,
/// like a player firing property observers on the calling thread.
pub struct FakeHandle {
    locator: String,
    state: Mutex<HandleState>,
}

impl FakeHandle {
    fn new(locator: &str, script: HandleScript) -> Self {
        Self {
            locator: locator.to_string(),
            state: Mutex::new(HandleState {
                status: script.status,
                tracks: script.tracks,
                duration: script.duration,
                ranges: script.ranges,
                rate: 0.0,
                time: MediaTime::ZERO,
                defer_seeks: script.defer_seeks,
                pending_seek: None,
                seeks: Vec::new(),
                play_calls: 0,
                pause_calls: 0,
                observers: Vec::new(),
                ever_attached: 0,
            }),
        }
    }

    fn observers(&self) -> Vec<Arc<dyn MediaObserver>> {
        self.state.lock().observers.clone()
    }

    fn notify(&self, f: impl Fn(&dyn MediaObserver)) {
        for observer in self.observers() {
            f(observer.as_ref());
        }
    }

    // ---- test controls -------------------------------------------------

    pub fn set_status(&self, status: MediaStatus) {
        self.state.lock().status = status.clone();
        self.notify(|o| o.status_changed(status.clone()));
    }

    pub fn set_tracks(&self, tracks: Vec<MediaTrack>) {
        self.state.lock().tracks = Some(tracks);
        self.notify(|o| o.tracks_changed());
    }

    pub fn set_duration(&self, duration: Option<MediaTime>) {
        self.state.lock().duration = duration;
        self.notify(|o| o.duration_changed(duration));
    }

    /// Moves the playhead without a seek, as playback would.
    pub fn advance_to(&self, time: MediaTime) {
        self.state.lock().time = time;
    }

    /// Rate change initiated outside the engine (OS controls, stalls).
    pub fn external_rate(&self, rate: f32) {
        self.state.lock().rate = rate;
        self.notify(|o| o.rate_changed(rate));
    }

    pub fn finish(&self) {
        let duration = self.state.lock().duration;
        if let Some(duration) = duration {
            self.advance_to(duration);
        }
        self.notify(|o| o.reached_end());
    }

    pub fn log_error(&self, message: &str) {
        self.notify(|o| o.error_logged(message.to_string()));
    }

    pub fn complete_seek(&self) {
        let pending = self.state.lock().pending_seek.take();
        if let Some(done) = pending {
            done(true);
        }
    }

    // ---- inspection ----------------------------------------------------

    pub fn seeks(&self) -> Vec<MediaTime> {
        self.state.lock().seeks.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().pause_calls
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    pub fn ever_attached(&self) -> usize {
        self.state.lock().ever_attached
    }
}

impl MediaHandle for FakeHandle {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn status(&self) -> MediaStatus {
        self.state.lock().status.clone()
    }

    fn play(&self) {
        {
            let mut state = self.state.lock();
            state.rate = 1.0;
            state.play_calls += 1;
        }
        self.notify(|o| o.rate_changed(1.0));
    }

    fn pause(&self) {
        {
            let mut state = self.state.lock();
            state.rate = 0.0;
            state.pause_calls += 1;
        }
        self.notify(|o| o.rate_changed(0.0));
    }

    fn seek(&self, position: MediaTime, on_complete: SeekCompletion) {
        let deferred = {
            let mut state = self.state.lock();
            state.seeks.push(position);
            state.time = position;
            if state.defer_seeks {
                state.pending_seek = Some(on_complete);
                None
            } else {
                Some(on_complete)
            }
        };
        if let Some(done) = deferred {
            done(true);
        }
    }

    fn cancel_pending_seeks(&self) {
        let pending = self.state.lock().pending_seek.take();
        if let Some(done) = pending {
            done(false);
        }
    }

    fn current_time(&self) -> MediaTime {
        self.state.lock().time
    }

    fn duration(&self) -> Option<MediaTime> {
        self.state.lock().duration
    }

    fn rate(&self) -> f32 {
        self.state.lock().rate
    }

    fn seekable_ranges(&self) -> Vec<TimeRange> {
        self.state.lock().ranges.clone()
    }

    fn tracks(&self) -> Option<Vec<MediaTrack>> {
        self.state.lock().tracks.clone()
    }

    fn attach_observer(&self, observer: Arc<dyn MediaObserver>) {
        let status = {
            let mut state = self.state.lock();
            state.observers.push(Arc::clone(&observer));
            state.ever_attached += 1;
            state.status.clone()
        };
        observer.status_changed(status);
    }

    fn detach_observers(&self) {
        self.state.lock().observers.clear();
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<NowPlayingInfo>>,
    clears: Mutex<usize>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<NowPlayingInfo> {
        self.published.lock().clone()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock()
    }
}

impl NowPlayingPublisher for RecordingPublisher {
    fn publish(&self, info: &NowPlayingInfo) {
        self.published.lock().push(info.clone());
    }

    fn clear(&self) {
        *self.clears.lock() += 1;
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    states: Mutex<Vec<PlaybackState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<PlaybackState> {
        self.states.lock().clone()
    }

    pub fn cases(&self) -> Vec<&'static str> {
        self.states.lock().iter().map(PlaybackState::case).collect()
    }
}

impl StateObserver for RecordingObserver {
    fn on_state_changed(&self, state: &PlaybackState) {
        self.states.lock().push(state.clone());
    }
}

/// Fixed-order queue.
pub struct ListNavigator {
    items: Vec<Item>,
}

impl ListNavigator {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    fn position(&self, current: Option<&ItemId>) -> Option<usize> {
        current.and_then(|id| self.items.iter().position(|item| &item.id == id))
    }
}

impl QueueNavigator for ListNavigator {
    fn next_item(&self, current: Option<&ItemId>) -> Option<Item> {
        match self.position(current) {
            Some(index) => self.items.get(index + 1).cloned(),
            None => self.items.first().cloned(),
        }
    }

    fn previous_item(&self, current: Option<&ItemId>) -> Option<Item> {
        let index = self.position(current)?;
        index.checked_sub(1).and_then(|i| self.items.get(i).cloned())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub handle: PlaybackHandle,
    pub engine: Arc<FakeEngine>,
    pub store: MemoryTimeStore,
    pub publisher: Arc<RecordingPublisher>,
    pub observer: Arc<RecordingObserver>,
    pub bus: EventBus,
}

impl Harness {
    pub fn start() -> Self {
        Self::start_with(|builder| builder)
    }

    /// Starts an engine wired to fakes; `customize` may override any
    /// collaborator.
    pub fn start_with(customize: impl FnOnce(PlaybackConfigBuilder) -> PlaybackConfigBuilder) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("core_playback=debug")
            .with_test_writer()
            .try_init();

        let engine = FakeEngine::new();
        let store = MemoryTimeStore::new();
        let publisher = Arc::new(RecordingPublisher::default());
        let observer = Arc::new(RecordingObserver::default());
        let bus = EventBus::new(256);

        let builder = PlaybackConfig::builder()
            .media_engine(engine.clone())
            .time_store(Arc::new(store.clone()))
            .audio_session(Arc::new(NoopAudioSession))
            .clock(Arc::new(FixedClock::default()))
            .now_playing(publisher.clone())
            .event_bus(bus.clone())
            .abort_on_invariant_violation(false);
        let config = customize(builder).build().expect("valid test config");

        let handle = PlaybackEngine::new(config)
            .with_state_observer(observer.clone())
            .spawn()
            .expect("engine spawns inside a tokio runtime");

        Self {
            handle,
            engine,
            store,
            publisher,
            observer,
            bus,
        }
    }

    /// Changes to `item` and waits until the engine settles.
    pub async fn play(&self, item: Item) -> PlaybackState {
        self.handle.change_item(Some(item), true);
        self.handle.settled_state().await
    }
}
