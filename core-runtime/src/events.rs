//! # Event Bus System
//!
//! Broadcasts playback session notifications using `tokio::sync::broadcast`
//! so UI layers, analytics and diagnostics can follow the session without
//! being wired into the engine.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps per-domain enums ([`SessionEvent`],
//!   [`TimestampEvent`])
//! - **EventBus**: central broadcast channel
//! - **EventStream**: receiver wrapper with predicate filtering
//!
//! Events are plain serializable values (ids and descriptions rather than
//! engine types) so they can be forwarded across an FFI or IPC boundary
//! unchanged.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Session(SessionEvent::StateChanged {
//!     state: "preparing".to_string(),
//!     item_id: Some("ep-1".to_string()),
//!     error: None,
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback state changed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep going.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error the engine ignores.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback session lifecycle
    Session(SessionEvent),
    /// Resume position persistence
    Timestamp(TimestampEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Timestamp(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::Fault { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::Diagnostic { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::StateChanged { error: Some(_), .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Session(SessionEvent::StateChanged { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events describing the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// The session entered a different state case or its error changed.
    StateChanged {
        /// State case name (`inactive`, `paused`, `preparing`, `listening`, `viewing`).
        state: String,
        item_id: Option<String>,
        /// Description of the error carried by the state, if any.
        error: Option<String>,
    },
    /// Now-playing information was pushed to the publisher.
    NowPlayingPublished {
        item_id: String,
        position_secs: f64,
        rate: f32,
    },
    /// Now-playing information was cleared.
    NowPlayingCleared,
    /// An internal invariant was violated.
    Fault {
        message: String,
        /// Whether the engine forced the session inactive to recover.
        recovered: bool,
    },
    /// Diagnostic-only report from the media engine, e.g. an error log entry.
    Diagnostic {
        item_id: Option<String>,
        message: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::StateChanged { .. } => "Playback state changed",
            SessionEvent::NowPlayingPublished { .. } => "Now playing info published",
            SessionEvent::NowPlayingCleared => "Now playing info cleared",
            SessionEvent::Fault { .. } => "Playback engine fault",
            SessionEvent::Diagnostic { .. } => "Media engine diagnostic",
        }
    }
}

// ============================================================================
// Timestamp Events
// ============================================================================

/// Events describing resume position writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum TimestampEvent {
    Saved {
        item_id: String,
        position_secs: f64,
        finished: bool,
    },
    /// The position was too close to the start to be worth keeping.
    Cleared { item_id: String },
}

impl TimestampEvent {
    fn description(&self) -> &str {
        match self {
            TimestampEvent::Saved { finished: true, .. } => "Item marked finished",
            TimestampEvent::Saved { .. } => "Resume position saved",
            TimestampEvent::Cleared { .. } => "Resume position cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning shares the underlying channel. Sends never block; subscribers that
/// fall more than `capacity` events behind receive `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional predicate filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let timestamps = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Timestamp(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next buffered event that passes the filter, if any.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state_changed(state: &str) -> CoreEvent {
        CoreEvent::Session(SessionEvent::StateChanged {
            state: state.to_string(),
            item_id: Some("ep-1".to_string()),
            error: None,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(state_changed("paused")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = CoreEvent::Timestamp(TimestampEvent::Saved {
            item_id: "ep-1".to_string(),
            position_secs: 42.5,
            finished: false,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Timestamp(_)));

        bus.emit(state_changed("listening")).ok();
        let cleared = CoreEvent::Timestamp(TimestampEvent::Cleared {
            item_id: "ep-1".to_string(),
        });
        bus.emit(cleared.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), cleared);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for state in ["preparing", "paused", "listening", "paused"] {
            bus.emit(state_changed(state)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(sub.recv().await.unwrap(), state_changed("listening"));
    }

    #[test]
    fn test_event_severity() {
        let fault = CoreEvent::Session(SessionEvent::Fault {
            message: "invariant violated".to_string(),
            recovered: true,
        });
        assert_eq!(fault.severity(), EventSeverity::Error);

        let failed = CoreEvent::Session(SessionEvent::StateChanged {
            state: "paused".to_string(),
            item_id: Some("ep-1".to_string()),
            error: Some("media decode failed".to_string()),
        });
        assert_eq!(failed.severity(), EventSeverity::Warning);

        assert_eq!(state_changed("paused").severity(), EventSeverity::Info);
        assert_eq!(
            CoreEvent::Session(SessionEvent::NowPlayingCleared).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_description() {
        let finished = CoreEvent::Timestamp(TimestampEvent::Saved {
            item_id: "ep-1".to_string(),
            position_secs: 58.0,
            finished: true,
        });
        assert_eq!(finished.description(), "Item marked finished");
    }

    #[test]
    fn test_event_serialization() {
        let event = state_changed("viewing");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Session\""));
        assert!(json.contains("\"event\":\"StateChanged\""));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(CoreEvent::Session(SessionEvent::NowPlayingCleared)).ok();
        assert!(matches!(stream.try_recv(), Some(Ok(_))));
    }
}
