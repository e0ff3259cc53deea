//! The playback state machine and its side effects.
//!
//! Transitions are grouped per state. Each handler matches every
//! [`PlaybackEvent`] variant explicitly, so adding an event forces a decision
//! in every state; pairs with no transition go through
//! [`Machine::invariant_violation`].

use std::sync::Arc;

use bridge_traits::{BridgeError, HandleId, Item, ItemId, MediaHandle, MediaStatus, MediaTime, Timestamp};
use core_runtime::config::PlaybackConfig;
use core_runtime::events::{CoreEvent, SessionEvent, TimestampEvent};
use core_runtime::logging::redact_locator;
use tokio::sync::mpsc::{error::SendError, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use super::worker::WorkerJob;
use super::{Direction, Input, MediaSignal, SeekPurpose};
use crate::error::{EngineFault, PlaybackError};
use crate::event::PlaybackEvent;
use crate::now_playing::{now_playing_info, NowPlayingGate};
use crate::policy::{
    clamp_scrub, presentation, Presentation, ResumePolicy, TimestampDecision, TimestampPolicy,
};
use crate::state::{AssetSnapshot, HandleRef, PlaybackState, StateObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Inactive,
    Activating,
    Active,
}

/// The handle the executor currently drives.
struct LiveHandle {
    id: HandleId,
    handle: Arc<dyn MediaHandle>,
    /// Reported `ReadyToPlay` at least once.
    ready: bool,
    /// Reported a failure; never reused for the same locator.
    failed: bool,
}

struct PendingLoad {
    generation: HandleId,
    /// Item the load is for; retargeted when another item shares the locator.
    item: ItemId,
    locator: String,
}

pub(crate) struct Machine {
    state: PlaybackState,
    config: PlaybackConfig,
    timestamps: TimestampPolicy,
    resume: ResumePolicy,
    observer: Option<Arc<dyn StateObserver>>,
    now_playing: NowPlayingGate,
    inputs: UnboundedSender<Input>,
    jobs: UnboundedSender<WorkerJob>,
    state_tx: watch::Sender<PlaybackState>,
    session: SessionPhase,
    activation_attempt: u64,
    live: Option<LiveHandle>,
    pending_load: Option<PendingLoad>,
    /// Counts side effects that may feed inputs back (worker jobs, seeks,
    /// transport calls). `settled_state` waits until it stops moving.
    effects: u64,
}

impl Machine {
    pub(crate) fn new(
        config: PlaybackConfig,
        observer: Option<Arc<dyn StateObserver>>,
        inputs: UnboundedSender<Input>,
        jobs: UnboundedSender<WorkerJob>,
        state_tx: watch::Sender<PlaybackState>,
    ) -> Self {
        Self {
            state: PlaybackState::default(),
            timestamps: TimestampPolicy::new(config.tuning.finished_margin),
            resume: ResumePolicy::new(config.tuning.resume_lookback),
            now_playing: NowPlayingGate::new(config.now_playing.clone()),
            config,
            observer,
            inputs,
            jobs,
            state_tx,
            session: SessionPhase::Inactive,
            activation_attempt: 0,
            live: None,
            pending_load: None,
            effects: 0,
        }
    }

    pub(crate) async fn run(mut self, mut inputs: UnboundedReceiver<Input>) {
        while let Some(input) = inputs.recv().await {
            if !self.handle_input(input) {
                break;
            }
        }
        debug!("Playback executor stopped");
    }

    /// Returns `false` once the engine shut down.
    fn handle_input(&mut self, input: Input) -> bool {
        match input {
            Input::Event(event) => self.apply(event),
            Input::Navigate(direction) => self.navigate(direction),
            Input::Media { handle, signal } => self.on_media_signal(handle, signal),
            Input::SessionActivated { attempt, result } => self.on_session_activated(attempt, result),
            Input::MediaLoaded {
                generation,
                item,
                result,
            } => self.on_media_loaded(generation, item, result),
            Input::SeekCompleted {
                generation,
                item,
                target,
                purpose,
                finished,
            } => self.on_seek_completed(generation, item, target, purpose, finished),
            Input::Sync(reply) => self.flush(reply),
            Input::Flushed { mark, reply } => {
                if mark == self.effects {
                    let _ = reply.send(self.state.clone());
                } else {
                    self.flush(reply);
                }
            }
            Input::Shutdown(reply) => {
                self.shutdown(reply);
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn apply(&mut self, event: PlaybackEvent) {
        debug!(state = %self.state, event = event.name(), "Applying playback event");

        let next = match self.state.clone() {
            PlaybackState::Inactive { error } => self.on_inactive(error, event),
            PlaybackState::Paused { item, asset, error } => self.on_paused(item, asset, error, event),
            PlaybackState::Preparing { item, resuming } => self.on_preparing(item, resuming, event),
            PlaybackState::Listening { item, .. } | PlaybackState::Viewing { item, .. } => {
                self.on_playing(item, event)
            }
        };
        self.commit(next);
    }

    fn on_inactive(&mut self, error: Option<PlaybackError>, event: PlaybackEvent) -> PlaybackState {
        match event {
            PlaybackEvent::Change {
                item: Some(item),
                resuming,
            } => self.activate(item, resuming),
            PlaybackEvent::Change { item: None, .. } => {
                self.end_session();
                PlaybackState::Inactive { error: None }
            }
            PlaybackEvent::Resume
            | PlaybackEvent::Pause
            | PlaybackEvent::Toggle
            | PlaybackEvent::Video
            | PlaybackEvent::Scrub(_) => {
                debug!(event = event.name(), "No active item; ignoring command");
                PlaybackState::Inactive { error }
            }
            PlaybackEvent::Ready
            | PlaybackEvent::Playing
            | PlaybackEvent::Paused
            | PlaybackEvent::End
            | PlaybackEvent::Error(_) => self.invariant_violation(&event),
        }
    }

    fn on_paused(
        &mut self,
        item: Item,
        asset: Option<AssetSnapshot>,
        error: Option<PlaybackError>,
        event: PlaybackEvent,
    ) -> PlaybackState {
        match event {
            PlaybackEvent::Change {
                item: Some(next),
                resuming,
            } => {
                if next == item && error.is_none() {
                    PlaybackState::Paused { item, asset, error }
                } else {
                    self.prepare(next, resuming)
                }
            }
            PlaybackEvent::Change { item: None, .. } => {
                self.end_session();
                PlaybackState::Inactive { error: None }
            }
            PlaybackEvent::Resume | PlaybackEvent::Toggle => self.prepare(item, true),
            PlaybackEvent::Playing => self.enter_playing(item, &event),
            PlaybackEvent::Ready => {
                self.seek_to_resume(&item, false);
                PlaybackState::Paused {
                    item,
                    asset: self.snapshot().or(asset),
                    error,
                }
            }
            PlaybackEvent::Error(e) => {
                self.pause_engine();
                PlaybackState::Paused {
                    item,
                    asset: self.snapshot(),
                    error: Some(e),
                }
            }
            PlaybackEvent::Scrub(position) => {
                self.scrub(&item, position);
                PlaybackState::Paused { item, asset, error }
            }
            PlaybackEvent::Paused | PlaybackEvent::Video | PlaybackEvent::Pause => {
                debug!(event = event.name(), "Already paused");
                PlaybackState::Paused { item, asset, error }
            }
            PlaybackEvent::End => self.invariant_violation(&event),
        }
    }

    fn on_preparing(&mut self, item: Item, resuming: bool, event: PlaybackEvent) -> PlaybackState {
        match event {
            PlaybackEvent::Error(e) => PlaybackState::Paused {
                item,
                asset: None,
                error: Some(e),
            },
            PlaybackEvent::Resume => PlaybackState::Preparing {
                item,
                resuming: true,
            },
            PlaybackEvent::Pause => {
                self.pause_engine();
                PlaybackState::Preparing { item, resuming }
            }
            PlaybackEvent::Toggle => PlaybackState::Preparing {
                item,
                resuming: !resuming,
            },
            PlaybackEvent::Paused => PlaybackState::Paused {
                item,
                asset: None,
                error: None,
            },
            PlaybackEvent::Ready => match self.live.as_ref().and_then(|live| live.handle.tracks()) {
                Some(_) => self.start(item, resuming),
                None => {
                    debug!(item = %item.id, "Ready without tracks; waiting for tracks");
                    PlaybackState::Preparing { item, resuming }
                }
            },
            PlaybackEvent::Change {
                item: Some(next),
                resuming: next_resuming,
            } => {
                if next == item {
                    PlaybackState::Preparing { item, resuming }
                } else {
                    self.prepare(next, next_resuming)
                }
            }
            PlaybackEvent::Change { item: None, .. } => {
                self.end_session();
                PlaybackState::Inactive { error: None }
            }
            PlaybackEvent::Playing => self.enter_playing(item, &event),
            PlaybackEvent::Video | PlaybackEvent::Scrub(_) => {
                debug!(event = event.name(), "Ignoring event while preparing");
                PlaybackState::Preparing { item, resuming }
            }
            PlaybackEvent::End => self.invariant_violation(&event),
        }
    }

    /// Shared by `Listening` and `Viewing`.
    fn on_playing(&mut self, item: Item, event: PlaybackEvent) -> PlaybackState {
        match event {
            PlaybackEvent::Error(e) => PlaybackState::Paused {
                item,
                asset: None,
                error: Some(e),
            },
            PlaybackEvent::Paused => {
                self.persist_live_position(&item.id);
                PlaybackState::Paused {
                    item,
                    asset: None,
                    error: None,
                }
            }
            PlaybackEvent::End => {
                info!(item = %item.id, "Reached end of item");
                self.pause_engine();
                self.state.clone()
            }
            PlaybackEvent::Change {
                item: Some(next),
                resuming,
            } => {
                if next == item {
                    self.state.clone()
                } else {
                    self.persist_live_position(&item.id);
                    self.prepare(next, resuming)
                }
            }
            PlaybackEvent::Change { item: None, .. } => {
                self.persist_live_position(&item.id);
                self.end_session();
                PlaybackState::Inactive { error: None }
            }
            PlaybackEvent::Toggle | PlaybackEvent::Pause => {
                self.pause_engine();
                self.state.clone()
            }
            PlaybackEvent::Scrub(position) => {
                self.scrub(&item, position);
                self.state.clone()
            }
            PlaybackEvent::Ready | PlaybackEvent::Playing | PlaybackEvent::Resume => {
                debug!(event = event.name(), "Already playing");
                self.state.clone()
            }
            PlaybackEvent::Video => self.invariant_violation(&event),
        }
    }

    // ------------------------------------------------------------------
    // Transition helpers
    // ------------------------------------------------------------------

    /// Leaves `Inactive`: the session is activated on the worker and the
    /// item loads once that succeeds.
    fn activate(&mut self, item: Item, resuming: bool) -> PlaybackState {
        match self.session {
            SessionPhase::Active => self.prepare(item, resuming),
            SessionPhase::Activating => PlaybackState::Preparing { item, resuming },
            SessionPhase::Inactive => {
                self.activation_attempt += 1;
                self.session = SessionPhase::Activating;
                debug!(item = %item.id, attempt = self.activation_attempt, "Activating audio session");
                self.dispatch(WorkerJob::ActivateSession {
                    attempt: self.activation_attempt,
                });
                PlaybackState::Preparing { item, resuming }
            }
        }
    }

    /// Makes `item` the live item, loading it unless the live handle already
    /// serves its locator.
    fn prepare(&mut self, item: Item, resuming: bool) -> PlaybackState {
        if self.session != SessionPhase::Active {
            // Loads once activation completes.
            return PlaybackState::Preparing { item, resuming };
        }

        let locator = match self.config.locator_proxy.resolve(&item) {
            Ok(locator) => locator,
            Err(err) => {
                warn!(item = %item.id, error = %err, "Could not resolve media locator");
                self.release_media();
                return PlaybackState::Paused {
                    item,
                    asset: None,
                    error: Some(PlaybackError::MediaUnreachable),
                };
            }
        };

        if let Some(live) = self.live.as_ref().filter(|live| !live.failed) {
            if live.handle.locator() == locator {
                if live.ready && live.handle.tracks().is_some() {
                    return self.start(item, resuming);
                }
                return PlaybackState::Preparing { item, resuming };
            }
        }

        if let Some(pending) = self
            .pending_load
            .as_mut()
            .filter(|pending| pending.locator == locator)
        {
            pending.item = item.id.clone();
            return PlaybackState::Preparing { item, resuming };
        }

        self.load(&item.id, locator);
        PlaybackState::Preparing { item, resuming }
    }

    fn load(&mut self, item: &ItemId, locator: String) {
        let generation = HandleId::new();
        self.live = None;
        self.pending_load = Some(PendingLoad {
            generation,
            item: item.clone(),
            locator: locator.clone(),
        });
        self.dispatch(WorkerJob::Load {
            generation,
            item: item.clone(),
            locator,
        });
    }

    /// The live handle is ready with tracks: seek to the resume position and
    /// settle on the presentation its tracks call for.
    fn start(&mut self, item: Item, resuming: bool) -> PlaybackState {
        let Some(live) = self.live_ref() else {
            return PlaybackState::Preparing { item, resuming };
        };
        let tracks = live.handle().tracks().unwrap_or_default();

        match presentation(&tracks) {
            Presentation::Unsupported => {
                warn!(item = %item.id, "Media has no playable audio or video track");
                PlaybackState::Paused {
                    item,
                    asset: Some(live.snapshot()),
                    error: Some(PlaybackError::UnsupportedMedia),
                }
            }
            kind => {
                self.seek_to_resume(&item, resuming);
                match (resuming, kind) {
                    (false, _) => PlaybackState::Paused {
                        item,
                        asset: Some(live.snapshot()),
                        error: None,
                    },
                    (true, Presentation::Viewing) => PlaybackState::Viewing { item, handle: live },
                    (true, _) => PlaybackState::Listening {
                        asset: live.snapshot(),
                        item,
                    },
                }
            }
        }
    }

    /// The engine reports playback for an item whose presentation is
    /// resolved from the loaded tracks.
    fn enter_playing(&mut self, item: Item, event: &PlaybackEvent) -> PlaybackState {
        let Some(live) = self.live_ref() else {
            return self.invariant_violation(event);
        };
        let Some(tracks) = live.handle().tracks() else {
            return self.invariant_violation(event);
        };

        match presentation(&tracks) {
            Presentation::Listening => PlaybackState::Listening {
                asset: live.snapshot(),
                item,
            },
            Presentation::Viewing => PlaybackState::Viewing { item, handle: live },
            Presentation::Unsupported => {
                self.pause_engine();
                PlaybackState::Paused {
                    item,
                    asset: Some(live.snapshot()),
                    error: Some(PlaybackError::UnsupportedMedia),
                }
            }
        }
    }

    /// Forgets the live handle and any load in flight. The worker detaches
    /// and pauses whatever it attached last, so a load still queued ahead of
    /// the release is covered too.
    fn release_media(&mut self) {
        let live = self.live.take();
        let pending = self.pending_load.take();
        if live.is_some() || pending.is_some() {
            self.dispatch(WorkerJob::Release);
        }
    }

    fn end_session(&mut self) {
        self.release_media();
        if self.session != SessionPhase::Inactive {
            self.session = SessionPhase::Inactive;
            self.dispatch(WorkerJob::DeactivateSession);
        }
    }

    fn invariant_violation(&mut self, event: &PlaybackEvent) -> PlaybackState {
        let fault = EngineFault::InvariantViolation {
            state: self.state.to_string(),
            event: event.name().to_string(),
        };
        let abort = self.config.tuning.abort_on_invariant_violation;

        error!(fault = %fault, "Playback invariant violated");
        self.emit(CoreEvent::Session(SessionEvent::Fault {
            message: fault.to_string(),
            recovered: !abort,
        }));

        if abort {
            panic!("{}", fault);
        }

        self.end_session();
        PlaybackState::Inactive {
            error: Some(PlaybackError::Unexpected(fault.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Media engine input
    // ------------------------------------------------------------------

    fn on_media_signal(&mut self, handle: HandleId, signal: MediaSignal) {
        let Some(live) = self.live.as_mut().filter(|live| live.id == handle) else {
            debug!(handle = %handle, signal = ?signal, "Discarding signal from stale media handle");
            return;
        };

        match signal {
            MediaSignal::Status(MediaStatus::ReadyToPlay) => {
                live.ready = true;
                self.apply(PlaybackEvent::Ready);
            }
            MediaSignal::Status(MediaStatus::Failed(reason)) => {
                live.failed = true;
                warn!(handle = %handle, reason = %reason, "Media failed");
                self.apply(PlaybackEvent::Error(PlaybackError::MediaDecodeFailed));
            }
            MediaSignal::Status(MediaStatus::Unknown) => {
                if live.ready {
                    live.ready = false;
                    live.failed = true;
                    warn!(handle = %handle, "Media status became unknown");
                    self.apply(PlaybackEvent::Error(PlaybackError::MediaStatusUnknown));
                } else {
                    debug!(handle = %handle, "Media status not known yet");
                }
            }
            MediaSignal::TracksChanged => {
                if live.ready && matches!(self.state, PlaybackState::Preparing { .. }) {
                    self.apply(PlaybackEvent::Ready);
                }
            }
            MediaSignal::DurationChanged(duration) => {
                debug!(handle = %handle, duration = ?duration, "Media duration changed");
                self.refresh_now_playing(false);
            }
            MediaSignal::RateChanged(rate) => {
                let event = if rate > 0.0 {
                    PlaybackEvent::Playing
                } else {
                    PlaybackEvent::Paused
                };
                self.apply(event);
            }
            MediaSignal::ReachedEnd => self.apply(PlaybackEvent::End),
            MediaSignal::ErrorLogged(message) => {
                let item_id = self.state.item().map(|item| item.id.to_string());
                warn!(
                    item = ?item_id,
                    error = %PlaybackError::EndOfStreamLogged,
                    message = %message,
                    "Media engine logged an error"
                );
                self.emit(CoreEvent::Session(SessionEvent::Diagnostic { item_id, message }));
            }
        }
    }

    fn on_session_activated(&mut self, attempt: u64, result: Result<(), BridgeError>) {
        if attempt != self.activation_attempt || self.session != SessionPhase::Activating {
            debug!(attempt, "Ignoring stale audio session activation");
            return;
        }

        match result {
            Ok(()) => {
                info!("Audio session activated");
                self.session = SessionPhase::Active;
                if let PlaybackState::Preparing { item, resuming } = self.state.clone() {
                    if self.live.is_none() && self.pending_load.is_none() {
                        let next = self.prepare(item, resuming);
                        self.commit(next);
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "Audio session activation failed");
                self.session = SessionPhase::Inactive;
                if !self.state.is_inactive() {
                    self.commit(PlaybackState::Inactive {
                        error: Some(PlaybackError::SessionActivationFailed),
                    });
                }
            }
        }
    }

    fn on_media_loaded(
        &mut self,
        generation: HandleId,
        item: ItemId,
        result: Result<Arc<dyn MediaHandle>, BridgeError>,
    ) {
        let pending = match self.pending_load.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.pending_load = other;
                debug!(item = %item, handle = %generation, "Discarding stale load result");
                return;
            }
        };
        if self.state.item().map(|current| &current.id) != Some(&pending.item) {
            debug!(item = %item, handle = %generation, "Discarding load result for replaced item");
            if result.is_ok() {
                self.dispatch(WorkerJob::Release);
            }
            return;
        }

        match result {
            Ok(handle) => {
                debug!(item = %item, handle = %generation, "Media loaded");
                self.live = Some(LiveHandle {
                    id: generation,
                    handle,
                    ready: false,
                    failed: false,
                });
            }
            Err(err) => {
                self.apply(PlaybackEvent::Error(PlaybackError::from_load_error(&err)));
            }
        }
    }

    fn on_seek_completed(
        &mut self,
        generation: HandleId,
        item: ItemId,
        target: MediaTime,
        purpose: SeekPurpose,
        finished: bool,
    ) {
        let current = self.state.item().map(|current| &current.id);
        if !self.is_live(generation) || current != Some(&item) {
            debug!(item = %item, target = %target, "Discarding stale seek completion");
            return;
        }
        if !finished {
            debug!(item = %item, target = %target, "Seek cancelled");
            return;
        }

        match purpose {
            SeekPurpose::Resume { play: true } => {
                let playing = matches!(
                    self.state,
                    PlaybackState::Listening { .. } | PlaybackState::Viewing { .. }
                );
                if let (true, Some(live)) = (playing, self.live.as_ref()) {
                    live.handle.play();
                    self.effects += 1;
                }
                self.refresh_now_playing(false);
            }
            SeekPurpose::Resume { play: false } => self.refresh_now_playing(false),
            SeekPurpose::Scrub => {
                let duration = self.live.as_ref().and_then(|live| live.handle.duration());
                self.persist(&item, target, duration);
                self.refresh_now_playing(false);
            }
        }
    }

    fn navigate(&mut self, direction: Direction) {
        let Some(navigator) = self.config.navigator.clone() else {
            debug!(direction = ?direction, "No queue navigator configured");
            return;
        };

        let current = self.state.item().map(|item| item.id.clone());
        let neighbour = match direction {
            Direction::Forward => navigator.next_item(current.as_ref()),
            Direction::Backward => navigator.previous_item(current.as_ref()),
        };

        match neighbour {
            Some(item) => {
                let resuming = self.state.is_playing_or_requested();
                self.apply(PlaybackEvent::Change {
                    item: Some(item),
                    resuming,
                });
            }
            None => info!(direction = ?direction, current = ?current, "No item to move to"),
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    fn is_live(&self, generation: HandleId) -> bool {
        self.live.as_ref().is_some_and(|live| live.id == generation)
    }

    fn live_ref(&self) -> Option<HandleRef> {
        self.live
            .as_ref()
            .map(|live| HandleRef::new(live.id, Arc::clone(&live.handle)))
    }

    fn snapshot(&self) -> Option<AssetSnapshot> {
        self.live
            .as_ref()
            .map(|live| AssetSnapshot::capture(live.handle.as_ref()))
    }

    fn dispatch(&mut self, job: WorkerJob) {
        self.effects += 1;
        if self.jobs.send(job).is_err() {
            warn!("Playback worker stopped; dropping job");
        }
    }

    fn flush(&mut self, reply: oneshot::Sender<PlaybackState>) {
        let job = WorkerJob::Flush {
            mark: self.effects,
            reply,
        };
        if let Err(SendError(WorkerJob::Flush { reply, .. })) = self.jobs.send(job) {
            let _ = reply.send(self.state.clone());
        }
    }

    fn pause_engine(&mut self) {
        if let Some(live) = &self.live {
            live.handle.cancel_pending_seeks();
            live.handle.pause();
            self.effects += 1;
        }
    }

    fn seek_to_resume(&mut self, item: &Item, play: bool) {
        let Some(live) = &self.live else {
            return;
        };
        let stored = self.config.time_store.time(&item.id);
        let target = self.resume.target(stored, &live.handle.seekable_ranges());
        debug!(item = %item.id, stored = ?stored, target = %target, play, "Seeking to resume position");
        self.seek(&item.id, target, SeekPurpose::Resume { play });
    }

    fn scrub(&mut self, item: &Item, position: MediaTime) {
        let Some(live) = &self.live else {
            debug!(item = %item.id, "No media loaded; ignoring scrub");
            return;
        };
        let target = clamp_scrub(position, live.handle.duration());
        debug!(item = %item.id, requested = %position, target = %target, "Scrubbing");
        self.seek(&item.id, target, SeekPurpose::Scrub);
    }

    /// Issues a seek on the live handle, cancelling any seek in flight.
    fn seek(&mut self, item: &ItemId, target: MediaTime, purpose: SeekPurpose) {
        let Some(live) = &self.live else {
            return;
        };
        let handle = Arc::clone(&live.handle);
        let generation = live.id;
        let inputs = self.inputs.clone();
        let item = item.clone();

        self.effects += 1;
        handle.cancel_pending_seeks();
        handle.seek(
            target,
            Box::new(move |finished| {
                let _ = inputs.send(Input::SeekCompleted {
                    generation,
                    item,
                    target,
                    purpose,
                    finished,
                });
            }),
        );
    }

    fn persist_live_position(&mut self, item: &ItemId) {
        let Some(live) = &self.live else {
            return;
        };
        let position = live.handle.current_time();
        let duration = live.handle.duration();
        self.persist(item, position, duration);
    }

    fn persist(&mut self, item: &ItemId, position: MediaTime, duration: Option<MediaTime>) {
        let store = &self.config.time_store;
        let event = match self.timestamps.classify(position, duration) {
            TimestampDecision::Remove => {
                store.remove(item);
                debug!(item = %item, position = %position, "Cleared resume position");
                TimestampEvent::Cleared {
                    item_id: item.to_string(),
                }
            }
            TimestampDecision::Normal(position) => {
                store.set(item, Timestamp::normal(position, self.config.clock.now()));
                debug!(item = %item, position = %position, "Saved resume position");
                TimestampEvent::Saved {
                    item_id: item.to_string(),
                    position_secs: position.seconds(),
                    finished: false,
                }
            }
            TimestampDecision::Finished(position) => {
                store.set(item, Timestamp::finished(position, self.config.clock.now()));
                info!(item = %item, position = %position, "Marked item finished");
                TimestampEvent::Saved {
                    item_id: item.to_string(),
                    position_secs: position.seconds(),
                    finished: true,
                }
            }
        };
        self.emit(CoreEvent::Timestamp(event));
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.config.event_bus {
            // No subscribers is fine.
            let _ = bus.emit(event);
        }
    }

    /// Installs `next` as the live state and notifies whoever cares.
    fn commit(&mut self, next: PlaybackState) {
        if next == self.state {
            return;
        }

        let previous = std::mem::replace(&mut self.state, next);
        self.state_tx.send_replace(self.state.clone());

        let significant = !previous.same_case_and_error(&self.state);
        if significant {
            info!(from = %previous, to = %self.state, "Playback state changed");
            if let Some(observer) = &self.observer {
                observer.on_state_changed(&self.state);
            }
            self.emit(CoreEvent::Session(SessionEvent::StateChanged {
                state: self.state.case().to_string(),
                item_id: self.state.item().map(|item| item.id.to_string()),
                error: self.state.error().map(|e| e.to_string()),
            }));
        }

        self.refresh_now_playing(significant);
    }

    fn refresh_now_playing(&mut self, force: bool) {
        let Some(item) = self.state.item() else {
            if self.now_playing.clear() {
                self.emit(CoreEvent::Session(SessionEvent::NowPlayingCleared));
            }
            return;
        };

        let handle = self.live.as_ref().map(|live| live.handle.as_ref());
        let info = now_playing_info(item, handle);
        let (position_secs, rate) = (info.position.seconds(), info.rate);
        if self.now_playing.offer(info, force) {
            debug!(
                item = %item.id,
                locator = %redact_locator(&item.locator),
                "Published now playing info"
            );
            let item_id = item.id.to_string();
            self.emit(CoreEvent::Session(SessionEvent::NowPlayingPublished {
                item_id,
                position_secs,
                rate,
            }));
        }
    }

    fn shutdown(&mut self, reply: Option<oneshot::Sender<()>>) {
        info!("Shutting down playback engine");
        if let PlaybackState::Listening { item, .. } | PlaybackState::Viewing { item, .. } =
            self.state.clone()
        {
            self.persist_live_position(&item.id);
        }
        self.end_session();
        self.commit(PlaybackState::Inactive { error: None });
        self.dispatch(WorkerJob::Stop(reply));
    }
}
