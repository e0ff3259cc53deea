//! Integration tests for the logging and event infrastructure

use bridge_traits::LogLevel;
use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent, TimestampEvent};
use core_runtime::logging::{init_logging, redact_locator, LogFormat, LoggingConfig};

#[test]
fn test_logging_initialization_once() {
    // A global subscriber can only be installed once per process.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());
    assert!(init_logging(config).is_err());

    tracing::debug!(target: "core_playback", "logging initialized");
}

#[test]
fn test_format_selection() {
    let config = LoggingConfig::default();
    if cfg!(debug_assertions) {
        assert_eq!(config.format, LogFormat::Pretty);
    } else {
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_locator_redaction() {
    assert_eq!(
        redact_locator("https://feeds.example.org/show/ep-7.mp3?sig=a1b2&exp=99"),
        "https://feeds.example.org/show/ep-7.mp3"
    );
    assert_eq!(
        redact_locator("file:///Users/alice/Podcasts/ep-7.mp3"),
        "file:///Users/alice/Podcasts/ep-7.mp3"
    );
    assert_eq!(redact_locator("/var/media/ep-7.mp3"), "ep-7.mp3");
    assert_eq!(redact_locator(""), "");
}

#[tokio::test]
async fn test_event_stream_follows_session() {
    let bus = EventBus::default();
    let mut sessions = EventStream::new(bus.subscribe())
        .filter(|event| matches!(event, CoreEvent::Session(_)));

    bus.emit(CoreEvent::Timestamp(TimestampEvent::Cleared {
        item_id: "ep-7".to_string(),
    }))
    .unwrap();
    bus.emit(CoreEvent::Session(SessionEvent::StateChanged {
        state: "listening".to_string(),
        item_id: Some("ep-7".to_string()),
        error: None,
    }))
    .unwrap();

    match sessions.recv().await.unwrap() {
        CoreEvent::Session(SessionEvent::StateChanged { state, .. }) => {
            assert_eq!(state, "listening")
        }
        other => panic!("unexpected event: {:?}", other),
    }
}
