mod common;

use std::sync::Arc;
use std::time::Duration;

use callsession::clock::ManualClock;
use callsession::ending::{CallClassification, CallEndHandler, DiscardCallLog, TracingMissedCallNotifier};
use callsession::models::CallRecord;
use callsession::router::{Screen, SurfaceRouter};
use callsession::session::{CallSessionState, StubListener};
use callsession::storage::SqliteCallLog;
use callsession_telecom::{CallDirection, CallId, CallState};

use common::{Harness, MemoryCallLog, MemoryNotifier, RecordingScreens, init_tracing};

fn missed_call() -> CallRecord {
    CallRecord::incoming(CallState::Disconnected)
        .with_handle("+15550100")
        .with_display_name("Erin")
        .with_creation_time(900_000)
}

#[tokio::test]
async fn test_missed_call_is_notified_logged_and_summarized() {
    init_tracing();
    let h = Harness::new();
    let log_id = h.end_handler.on_call_ended(missed_call(), true).await.unwrap();
    assert_eq!(log_id, Some(1));
    assert_eq!(
        h.notifier.notified(),
        vec![(Some("Erin".to_string()), "+15550100".to_string())]
    );
    let entries = h.call_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].classification, CallClassification::Missed);
    assert_eq!(entries[0].duration_seconds, 0);
    assert_eq!(entries[0].start_time, 900_000);
    assert_eq!(h.screens.last(), Some(Screen::Summary(1)));
}

#[tokio::test]
async fn test_outgoing_call_is_not_notified() {
    init_tracing();
    let h = Harness::new();
    h.clock.set(31_000);
    let record = CallRecord::outgoing(CallState::Disconnected)
        .with_handle("+15550101")
        .with_connect_time(1_000);
    h.end_handler.on_call_ended(record, false).await.unwrap();
    assert!(h.notifier.notified().is_empty());
    let entries = h.call_log.entries();
    assert_eq!(entries[0].classification, CallClassification::Outgoing);
    assert_eq!(entries[0].duration_seconds, 30);
}

#[tokio::test]
async fn test_missed_hint_does_not_override_classification() {
    init_tracing();
    let h = Harness::new();
    let record = CallRecord::new(CallId::new(), CallDirection::Incoming, CallState::Disconnected)
        .with_handle("+1")
        .with_connect_time(999_000);
    // The hint says missed, but the call was connected.
    h.end_handler.on_call_ended(record, true).await.unwrap();
    assert_eq!(h.call_log.entries()[0].classification, CallClassification::Incoming);
    assert!(h.notifier.notified().is_empty());
}

#[tokio::test]
async fn test_missed_call_without_caller_is_not_notified() {
    init_tracing();
    let h = Harness::new();
    let record = CallRecord::incoming(CallState::Disconnected).with_handle("   ");
    h.end_handler.on_call_ended(record, true).await.unwrap();
    assert!(h.notifier.notified().is_empty());
    assert_eq!(h.call_log.entries().len(), 1);

    // A name alone is enough to notify.
    let record = CallRecord::incoming(CallState::Disconnected).with_display_name("Frank");
    h.end_handler.on_call_ended(record, true).await.unwrap();
    assert_eq!(h.notifier.notified(), vec![(Some("Frank".to_string()), String::new())]);
}

#[tokio::test]
async fn test_persist_is_retried() {
    init_tracing();
    let h = Harness::with_collaborators(MemoryCallLog::failing(2), MemoryNotifier::default());
    let log_id = h.end_handler.on_call_ended(missed_call(), true).await.unwrap();
    assert_eq!(log_id, Some(1));
    assert_eq!(h.call_log.attempts(), 3);
    assert!(h.listener.collaborator.lock().is_empty());
}

#[tokio::test]
async fn test_persist_failure_is_reported() {
    init_tracing();
    let h = Harness::with_collaborators(MemoryCallLog::failing(5), MemoryNotifier::default());
    let log_id = h.end_handler.on_call_ended(missed_call(), true).await.unwrap();
    assert_eq!(log_id, None);
    assert_eq!(h.call_log.attempts(), 3);
    // The notifier still ran.
    assert_eq!(h.notifier.notified().len(), 1);
    let failures = h.listener.collaborator.lock().clone();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("call_log"), "{failures:?}");
    assert!(failures[0].contains("disk full"), "{failures:?}");
    assert!(!h.screens.screens().contains(&Screen::Summary(1)));
}

#[tokio::test]
async fn test_notifier_failure_does_not_block_persist() {
    init_tracing();
    let h = Harness::with_collaborators(MemoryCallLog::default(), MemoryNotifier::failing());
    let log_id = h.end_handler.on_call_ended(missed_call(), true).await.unwrap();
    assert_eq!(log_id, Some(1));
    assert_eq!(h.call_log.entries().len(), 1);
    let failures = h.listener.collaborator.lock().clone();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("missed_call_notifier"), "{failures:?}");
    assert_eq!(h.screens.last(), Some(Screen::Summary(1)));
}

#[tokio::test]
async fn test_default_collaborators() {
    init_tracing();
    let screens = RecordingScreens::default();
    let handler = CallEndHandler::new(
        Arc::new(CallSessionState::new()),
        Arc::new(DiscardCallLog::default()),
        Arc::new(TracingMissedCallNotifier),
        Arc::new(SurfaceRouter::new(screens.clone())),
        Arc::new(ManualClock::new(0)),
        Arc::new(StubListener),
    );
    let first = handler.on_call_ended(missed_call(), true).await.unwrap();
    let second = handler.on_call_ended(missed_call(), true).await.unwrap();
    assert!(first.is_some());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_sqlite_call_log() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("call_log.db");
    let call_log = Arc::new(SqliteCallLog::open(&path).await.unwrap());
    let screens = RecordingScreens::default();
    let clock = Arc::new(ManualClock::new(2_000_000));
    let handler = CallEndHandler::new(
        Arc::new(CallSessionState::new()),
        call_log.clone(),
        Arc::new(TracingMissedCallNotifier),
        Arc::new(SurfaceRouter::new(screens.clone())),
        clock.clone(),
        Arc::new(StubListener),
    );

    let missed_id = handler
        .on_call_ended(missed_call(), true)
        .await
        .unwrap()
        .unwrap();
    let answered = CallRecord::incoming(CallState::Disconnected)
        .with_handle("+15550102")
        .with_creation_time(1_000_000)
        .with_connect_time(1_500_000);
    let answered_id = handler.on_call_ended(answered, false).await.unwrap().unwrap();
    assert_ne!(missed_id, answered_id);
    assert_eq!(screens.last(), Some(Screen::Summary(answered_id)));

    let entry = call_log.find_by_id(missed_id).await.unwrap().unwrap();
    assert_eq!(entry.phone_number, "+15550100");
    assert_eq!(entry.display_name.as_deref(), Some("Erin"));
    assert_eq!(entry.direction, "Missed");
    assert_eq!(entry.timestamp, 900_000);
    assert_eq!(entry.duration_seconds, 0);

    let latest = call_log.latest().await.unwrap().unwrap();
    assert_eq!(latest.id, answered_id);
    assert_eq!(latest.direction, "Incoming");
    assert_eq!(latest.duration_seconds, 500);
    assert_eq!(latest.display_name, None);

    let latest_missed = call_log.latest_missed().await.unwrap().unwrap();
    assert_eq!(latest_missed.id, missed_id);
    assert_eq!(call_log.all().await.unwrap().len(), 2);
    assert!(call_log.find_by_id(answered_id + 100).await.unwrap().is_none());

    // Reopening keeps the history.
    drop(handler);
    drop(call_log);
    let reopened = SqliteCallLog::open(&path).await.unwrap();
    assert_eq!(reopened.all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_handler_does_not_wait_for_slow_collaborators() {
    init_tracing();
    let h = Harness::new();
    let task = h.end_handler.on_call_ended(missed_call(), true);
    // Dropping the handle detaches the task; the call is still filed.
    drop(task);
    let call_log = h.call_log.clone();
    assert!(
        common::wait_until(|| call_log.entries().len() == 1, 50, Duration::from_millis(10)).await
    );
}
