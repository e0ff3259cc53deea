//! # Playback Engine
//!
//! Runs the playback session state machine.
//!
//! ## Overview
//!
//! Every input (commands, media engine signals, results of blocking work)
//! is pushed into one unbounded channel. A single executor task drains it in
//! order and is the only code that touches [`PlaybackState`], so transitions
//! never race. Anything that may block (activating the audio session,
//! loading media, detaching observers) runs on a dedicated worker thread and
//! comes back as another input.
//!
//! ```text
//!  PlaybackHandle ──┐
//!  MediaObserver ───┼──► input channel ──► executor ──► worker thread
//!  seek callbacks ──┘          ▲                             │
//!                              └──────── results ────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{PlaybackEngine, PlaybackState};
//!
//! let handle = PlaybackEngine::new(config).spawn()?;
//! handle.change_item(Some(episode), true);
//!
//! let mut states = handle.subscribe();
//! while states.changed().await.is_ok() {
//!     if let PlaybackState::Listening { item, .. } = &*states.borrow() {
//!         println!("listening to {}", item.title);
//!     }
//! }
//! ```

mod machine;
mod observer;
mod worker;

use std::sync::Arc;

use bridge_traits::{BridgeError, HandleId, Item, ItemId, MediaHandle, MediaStatus, MediaTime};
use core_runtime::config::PlaybackConfig;
use core_runtime::error::{Error, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::event::PlaybackEvent;
use crate::state::{PlaybackState, StateObserver};

use machine::Machine;
use worker::Worker;

/// Queue direction for [`PlaybackHandle::forward`] and
/// [`PlaybackHandle::backward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

/// Signal reported by the observer attached to a media handle.
#[derive(Debug)]
pub(crate) enum MediaSignal {
    Status(MediaStatus),
    TracksChanged,
    DurationChanged(Option<MediaTime>),
    RateChanged(f32),
    ReachedEnd,
    ErrorLogged(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeekPurpose {
    /// Seek to the resume position, then optionally start playing.
    Resume { play: bool },
    /// Explicit seek requested by the user; persisted on completion.
    Scrub,
}

/// Everything the executor consumes.
pub(crate) enum Input {
    Event(PlaybackEvent),
    Navigate(Direction),
    Media {
        handle: HandleId,
        signal: MediaSignal,
    },
    SessionActivated {
        attempt: u64,
        result: std::result::Result<(), BridgeError>,
    },
    MediaLoaded {
        generation: HandleId,
        item: ItemId,
        result: std::result::Result<Arc<dyn MediaHandle>, BridgeError>,
    },
    SeekCompleted {
        generation: HandleId,
        item: ItemId,
        target: MediaTime,
        purpose: SeekPurpose,
        finished: bool,
    },
    Sync(oneshot::Sender<PlaybackState>),
    Flushed {
        mark: u64,
        reply: oneshot::Sender<PlaybackState>,
    },
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Builder for a running playback session.
pub struct PlaybackEngine {
    config: PlaybackConfig,
    observer: Option<Arc<dyn StateObserver>>,
}

impl PlaybackEngine {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Registers an observer notified when the state case or carried error
    /// changes.
    pub fn with_state_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Starts the executor on the current tokio runtime and the worker on a
    /// dedicated thread. The session starts `Inactive`.
    ///
    /// # Errors
    ///
    /// - [`Error::RuntimeUnavailable`] when called outside a tokio runtime
    /// - [`Error::Internal`] when the worker thread cannot be spawned
    pub fn spawn(self) -> Result<PlaybackHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::RuntimeUnavailable(e.to_string()))?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlaybackState::default());

        let worker = Worker::new(
            Arc::clone(&self.config.media_engine),
            Arc::clone(&self.config.audio_session),
            input_tx.clone(),
        );
        std::thread::Builder::new()
            .name("playback-worker".to_string())
            .spawn(move || worker.run(job_rx))
            .map_err(|e| Error::Internal(format!("Failed to spawn playback worker: {}", e)))?;

        let machine = Machine::new(self.config, self.observer, input_tx.clone(), job_tx, state_tx);
        runtime.spawn(machine.run(input_rx));
        debug!("Playback engine started");

        Ok(PlaybackHandle {
            inner: Arc::new(HandleInner {
                inputs: input_tx,
                state: state_rx,
            }),
        })
    }
}

struct HandleInner {
    inputs: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<PlaybackState>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let _ = self.inputs.send(Input::Shutdown(None));
    }
}

/// Command surface of a running playback session.
///
/// Commands only enqueue and return immediately; they can be called from any
/// thread. Their outcome, including failures, shows up in the state. The
/// session shuts down when the last clone is dropped.
#[derive(Clone)]
pub struct PlaybackHandle {
    inner: Arc<HandleInner>,
}

impl PlaybackHandle {
    fn send(&self, input: Input) {
        if self.inner.inputs.send(input).is_err() {
            debug!("Playback engine stopped; dropping command");
        }
    }

    fn event(&self, event: PlaybackEvent) {
        self.send(Input::Event(event));
    }

    pub fn resume(&self) {
        self.event(PlaybackEvent::Resume);
    }

    pub fn pause(&self) {
        self.event(PlaybackEvent::Pause);
    }

    pub fn toggle(&self) {
        self.event(PlaybackEvent::Toggle);
    }

    /// Skips to the navigator's next item.
    pub fn forward(&self) {
        self.send(Input::Navigate(Direction::Forward));
    }

    /// Goes back to the navigator's previous item.
    pub fn backward(&self) {
        self.send(Input::Navigate(Direction::Backward));
    }

    pub fn scrub(&self, position: MediaTime) {
        self.event(PlaybackEvent::Scrub(position));
    }

    /// Switches to `item` (or ends the session for `None`). With `resuming`
    /// playback starts as soon as the item is ready.
    pub fn change_item(&self, item: Option<Item>, resuming: bool) {
        self.event(PlaybackEvent::Change { item, resuming });
    }

    /// Reports that a video surface took over presentation.
    pub fn video(&self) {
        self.event(PlaybackEvent::Video);
    }

    /// Latest published state.
    pub fn state(&self) -> PlaybackState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state.clone()
    }

    /// State once every input enqueued before this call, and the work it
    /// triggered on the worker thread, has been applied.
    pub async fn settled_state(&self) -> PlaybackState {
        let (tx, rx) = oneshot::channel();
        if self.inner.inputs.send(Input::Sync(tx)).is_err() {
            return self.state();
        }
        match rx.await {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Persists the position if playing, releases the media handle and the
    /// audio session, and stops the engine.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.inputs.send(Input::Shutdown(Some(tx))).is_ok() {
            let _ = rx.await;
        }
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
