use bridge_traits::{HandleId, MediaObserver, MediaStatus, MediaTime};
use tokio::sync::mpsc::UnboundedSender;

use super::{Input, MediaSignal};

/// Forwards media engine callbacks into the executor, tagged with the load
/// they belong to.
pub(crate) struct ObserverBridge {
    handle: HandleId,
    inputs: UnboundedSender<Input>,
}

impl ObserverBridge {
    pub(crate) fn new(handle: HandleId, inputs: UnboundedSender<Input>) -> Self {
        Self { handle, inputs }
    }

    fn forward(&self, signal: MediaSignal) {
        // The executor is gone once the session shut down.
        let _ = self.inputs.send(Input::Media {
            handle: self.handle,
            signal,
        });
    }
}

impl MediaObserver for ObserverBridge {
    fn status_changed(&self, status: MediaStatus) {
        self.forward(MediaSignal::Status(status));
    }

    fn tracks_changed(&self) {
        self.forward(MediaSignal::TracksChanged);
    }

    fn duration_changed(&self, duration: Option<MediaTime>) {
        self.forward(MediaSignal::DurationChanged(duration));
    }

    fn rate_changed(&self, rate: f32) {
        self.forward(MediaSignal::RateChanged(rate));
    }

    fn reached_end(&self) {
        self.forward(MediaSignal::ReachedEnd);
    }

    fn error_logged(&self, message: String) {
        self.forward(MediaSignal::ErrorLogged(message));
    }
}
