//! Dedicated thread for the blocking half of the engine.

use std::sync::Arc;

use bridge_traits::{AudioSession, HandleId, ItemId, MediaEngine, MediaHandle};
use core_runtime::logging::redact_locator;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::observer::ObserverBridge;
use super::Input;
use crate::state::PlaybackState;

/// Work the executor hands off. Processed strictly in order.
pub(crate) enum WorkerJob {
    ActivateSession {
        attempt: u64,
    },
    DeactivateSession,
    /// Detach the previous handle, load `locator` and attach an observer.
    Load {
        generation: HandleId,
        item: ItemId,
        locator: String,
    },
    /// Detach and pause the attached handle.
    Release,
    /// Round trip used to wait for outstanding work.
    Flush {
        mark: u64,
        reply: oneshot::Sender<PlaybackState>,
    },
    Stop(Option<oneshot::Sender<()>>),
}

pub(crate) struct Worker {
    engine: Arc<dyn MediaEngine>,
    session: Arc<dyn AudioSession>,
    inputs: UnboundedSender<Input>,
    /// The only handle with an observer attached.
    attached: Option<Arc<dyn MediaHandle>>,
}

impl Worker {
    pub(crate) fn new(
        engine: Arc<dyn MediaEngine>,
        session: Arc<dyn AudioSession>,
        inputs: UnboundedSender<Input>,
    ) -> Self {
        Self {
            engine,
            session,
            inputs,
            attached: None,
        }
    }

    pub(crate) fn run(mut self, mut jobs: UnboundedReceiver<WorkerJob>) {
        debug!("Playback worker started");

        while let Some(job) = jobs.blocking_recv() {
            match job {
                WorkerJob::ActivateSession { attempt } => {
                    let result = self.session.activate();
                    self.send(Input::SessionActivated { attempt, result });
                }
                WorkerJob::DeactivateSession => {
                    if let Err(err) = self.session.deactivate() {
                        warn!(error = %err, "Failed to deactivate audio session");
                    }
                }
                WorkerJob::Load {
                    generation,
                    item,
                    locator,
                } => self.load(generation, item, locator),
                WorkerJob::Release => self.release(),
                WorkerJob::Flush { mark, reply } => self.send(Input::Flushed { mark, reply }),
                WorkerJob::Stop(reply) => {
                    self.release();
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    break;
                }
            }
        }

        self.release();
        debug!("Playback worker stopped");
    }

    fn send(&self, input: Input) {
        if self.inputs.send(input).is_err() {
            debug!("Playback executor gone; dropping worker result");
        }
    }

    fn load(&mut self, generation: HandleId, item: ItemId, locator: String) {
        self.release();

        info!(
            item = %item,
            handle = %generation,
            locator = %redact_locator(&locator),
            "Loading media"
        );

        match self.engine.load(&locator) {
            Ok(handle) => {
                // The load result must be queued before the observer replays
                // the current status.
                self.send(Input::MediaLoaded {
                    generation,
                    item,
                    result: Ok(Arc::clone(&handle)),
                });
                let observer = ObserverBridge::new(generation, self.inputs.clone());
                handle.attach_observer(Arc::new(observer));
                self.attached = Some(handle);
            }
            Err(err) => {
                warn!(item = %item, error = %err, "Media load failed");
                self.send(Input::MediaLoaded {
                    generation,
                    item,
                    result: Err(err),
                });
            }
        }
    }

    fn release(&mut self) {
        if let Some(handle) = self.attached.take() {
            handle.detach_observers();
            handle.pause();
            debug!(locator = %redact_locator(handle.locator()), "Released media handle");
        }
    }
}
