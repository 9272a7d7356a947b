mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use callsession::SessionError;
use callsession::clock::ManualClock;
use callsession::ending::{CallClassification, CallEndHandler};
use callsession::models::{AudioState, CallDetails, CallRecord};
use callsession::router::{Screen, SurfaceRouter};
use callsession::session::{CallEvent, CallEventIngester, CallSessionState, SessionListener};
use callsession_telecom::{AudioRoute, CallDirection, CallId, CallState, Capabilities, RouteMask};

use common::{Harness, MemoryCallLog, MemoryNotifier, RecordingScreens, init_tracing, wait_until};

#[tokio::test]
async fn test_version_increases_on_membership_changes() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Active);
    let b = CallRecord::outgoing(CallState::Dialing);
    let c = CallRecord::incoming(CallState::Holding);
    let mut last_version = h.state.snapshot().version();
    let events = vec![
        CallEvent::CallAdded(a.clone()),
        CallEvent::CallAdded(b.clone()),
        CallEvent::CallRemoved(a.id),
        CallEvent::CallAdded(c.clone()),
        CallEvent::CallRemoved(b.id),
        CallEvent::CallRemoved(c.id),
    ];
    for event in events {
        h.ingester.apply(event).await;
        let snapshot = h.state.snapshot();
        assert!(snapshot.version() > last_version);
        last_version = snapshot.version();
        let mut ids: Vec<CallId> = snapshot.calls.calls.iter().map(|call| call.id).collect();
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len, "duplicate call ids in {:?}", snapshot.calls);
    }
    assert_eq!(last_version, 6);
    assert!(h.listener.inconsistent.lock().is_empty());
}

#[tokio::test]
async fn test_duplicate_add_is_ignored() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Ringing);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester
        .apply(CallEvent::CallAdded(a.clone().with_display_name("Mallory")))
        .await;
    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.calls.len(), 1);
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.calls.calls[0].caller_display_name, None);
    let listener = h.listener.clone();
    assert!(
        wait_until(
            || listener.inconsistent.lock().len() == 1,
            50,
            Duration::from_millis(10)
        )
        .await
    );
}

#[tokio::test]
async fn test_events_for_unknown_calls_are_ignored() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Ringing);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    let stranger = CallId::new();
    h.ingester
        .apply(CallEvent::StateChanged(stranger, CallState::Active))
        .await;
    h.ingester
        .apply(CallEvent::DetailsChanged(stranger, CallDetails::default()))
        .await;
    h.ingester
        .apply(CallEvent::ConferenceableChanged(stranger, vec![a.id]))
        .await;
    h.ingester.apply(CallEvent::CallRemoved(stranger)).await;
    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.calls.calls[0], a);
    let listener = h.listener.clone();
    assert!(
        wait_until(
            || listener.inconsistent.lock().len() == 4,
            50,
            Duration::from_millis(10)
        )
        .await
    );
}

#[tokio::test]
async fn test_touch_events_bump_version() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Ringing);
    let b = CallRecord::incoming(CallState::Holding);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester.apply(CallEvent::CallAdded(b.clone())).await;
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Active))
        .await;
    let mut details = a.details();
    details.capabilities = Capabilities::MERGE_CONFERENCE;
    details.connect_time = 42;
    h.ingester
        .apply(CallEvent::DetailsChanged(a.id, details))
        .await;
    h.ingester
        .apply(CallEvent::ConferenceableChanged(a.id, vec![b.id, a.id]))
        .await;
    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.version(), 5);
    let record = snapshot.calls.get(a.id).unwrap();
    assert_eq!(record.state, CallState::Active);
    assert_eq!(record.connect_time, 42);
    assert!(record.capabilities.can_merge());
    // A call is never conferenceable with itself.
    assert_eq!(record.conferenceable.iter().copied().collect::<Vec<_>>(), vec![b.id]);
    assert!(snapshot.can_merge());
}

#[tokio::test]
async fn test_audio_state_does_not_bump_version() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Active);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    let audio = AudioState::new(
        AudioRoute::Speaker,
        RouteMask::empty().with(AudioRoute::Speaker),
        true,
    );
    h.ingester.apply(CallEvent::AudioStateChanged(audio)).await;
    let snapshot = h.state.snapshot();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.audio, Some(audio));
    assert!(snapshot.is_muted());
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;
    assert_eq!(h.state.snapshot().audio, None);
}

#[tokio::test]
async fn test_routes_follow_primary_call() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Ringing).with_handle("+100");
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Active))
        .await;
    // Details changes never route.
    h.ingester
        .apply(CallEvent::DetailsChanged(a.id, a.details()))
        .await;
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Holding))
        .await;
    // A held call stays in front of a second ringing call.
    let b = CallRecord::incoming(CallState::Ringing);
    h.ingester.apply(CallEvent::CallAdded(b.clone())).await;
    assert_eq!(h.router.current(), Some(Screen::Ongoing));
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;
    h.ingester.apply(CallEvent::CallRemoved(b.id)).await;
    assert_eq!(
        h.screens.screens()[..4],
        [
            Screen::Incoming,
            Screen::Ongoing,
            Screen::Incoming,
            Screen::None
        ]
    );
}

#[tokio::test]
async fn test_empty_session() {
    init_tracing();
    let mut h = Harness::new();
    let snapshot = h.state.snapshot();
    assert!(snapshot.primary_call().is_none());
    assert!(!snapshot.can_swap());
    assert!(!snapshot.can_merge());
    let a = CallRecord::outgoing(CallState::Dialing);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;
    assert!(h.state.snapshot().primary_call().is_none());
    assert!(h.screens.screens().contains(&Screen::None));
}

#[tokio::test]
async fn test_missed_call_handed_off_once() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Ringing)
        .with_handle("+15550199")
        .with_display_name("Dave");
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Disconnected))
        .await;
    // A repeated terminal state must not log the call twice.
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Disconnected))
        .await;
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;

    let call_log = h.call_log.clone();
    assert!(
        wait_until(|| !call_log.entries().is_empty(), 50, Duration::from_millis(10)).await,
        "call was never logged"
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    let entries = h.call_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].classification, CallClassification::Missed);
    assert_eq!(entries[0].number, "+15550199");
    assert_eq!(
        h.notifier.notified(),
        vec![(Some("Dave".to_string()), "+15550199".to_string())]
    );
    let screens = h.screens.clone();
    assert!(
        wait_until(
            || screens.last() == Some(Screen::Summary(1)),
            50,
            Duration::from_millis(10)
        )
        .await
    );
}

#[tokio::test]
async fn test_removed_without_disconnect_is_still_logged() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Ringing).with_handle("+1");
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;
    let call_log = h.call_log.clone();
    assert!(wait_until(|| call_log.entries().len() == 1, 50, Duration::from_millis(10)).await);
    assert_eq!(h.call_log.entries()[0].classification, CallClassification::Missed);
}

#[tokio::test]
async fn test_answered_call_duration() {
    init_tracing();
    let mut h = Harness::new();
    h.clock.set(61_000);
    let a = CallRecord::new(CallId::new(), CallDirection::Incoming, CallState::Active)
        .with_creation_time(500)
        .with_connect_time(1_000);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Disconnected))
        .await;
    let call_log = h.call_log.clone();
    assert!(wait_until(|| call_log.entries().len() == 1, 50, Duration::from_millis(10)).await);
    let entry = &h.call_log.entries()[0];
    assert_eq!(entry.classification, CallClassification::Incoming);
    assert_eq!(entry.duration_seconds, 60);
    assert_eq!(entry.start_time, 500);
    assert!(h.notifier.notified().is_empty());
}

#[tokio::test]
async fn test_call_added_already_disconnected() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::outgoing(CallState::Disconnected).with_handle("+2");
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;
    let call_log = h.call_log.clone();
    assert!(wait_until(|| call_log.entries().len() == 1, 50, Duration::from_millis(10)).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.call_log.entries().len(), 1);
    assert_eq!(
        h.call_log.entries()[0].classification,
        CallClassification::Outgoing
    );
}

#[tokio::test]
async fn test_summary_waits_for_ringing_call() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Active).with_connect_time(1_000);
    let b = CallRecord::incoming(CallState::Ringing);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester.apply(CallEvent::CallAdded(b.clone())).await;
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Disconnected))
        .await;
    h.ingester.apply(CallEvent::CallRemoved(a.id)).await;

    let call_log = h.call_log.clone();
    assert!(wait_until(|| call_log.entries().len() == 1, 50, Duration::from_millis(10)).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.router.current(), Some(Screen::Incoming));
    assert!(!h.screens.screens().contains(&Screen::Summary(1)));

    // Once the last call ends, its summary comes up.
    h.ingester
        .apply(CallEvent::StateChanged(b.id, CallState::Disconnected))
        .await;
    h.ingester.apply(CallEvent::CallRemoved(b.id)).await;
    let screens = h.screens.clone();
    assert!(
        wait_until(
            || screens.last() == Some(Screen::Summary(2)),
            50,
            Duration::from_millis(10)
        )
        .await,
        "{:?}",
        h.screens.screens()
    );
}

#[tokio::test]
async fn test_summary_waits_for_held_call() {
    init_tracing();
    let mut h = Harness::new();
    let a = CallRecord::incoming(CallState::Active).with_connect_time(1_000);
    let b = CallRecord::outgoing(CallState::Holding).with_connect_time(2_000);
    h.ingester.apply(CallEvent::CallAdded(a.clone())).await;
    h.ingester.apply(CallEvent::CallAdded(b.clone())).await;
    // The ended leg is still listed while its end is handled.
    h.ingester
        .apply(CallEvent::StateChanged(a.id, CallState::Disconnected))
        .await;

    let call_log = h.call_log.clone();
    assert!(wait_until(|| call_log.entries().len() == 1, 50, Duration::from_millis(10)).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.router.current(), Some(Screen::Ongoing));
    assert_eq!(h.screens.screens(), vec![Screen::Ongoing]);
}

/// Listener whose notices never complete.
struct StuckListener;

#[async_trait]
impl SessionListener for StuckListener {
    async fn on_action_rejected(&self, _error: &SessionError) {
        std::future::pending::<()>().await;
    }

    async fn on_inconsistent_event(&self, _error: &SessionError) {
        std::future::pending::<()>().await;
    }

    async fn on_collaborator_failure(&self, _error: &SessionError) {
        std::future::pending::<()>().await;
    }
}

#[tokio::test]
async fn test_stuck_listener_does_not_stall_events() {
    init_tracing();
    let state = Arc::new(CallSessionState::new());
    let router = Arc::new(SurfaceRouter::new(RecordingScreens::default()));
    let listener: Arc<dyn SessionListener> = Arc::new(StuckListener);
    let end_handler = Arc::new(CallEndHandler::new(
        state.clone(),
        Arc::new(MemoryCallLog::default()),
        Arc::new(MemoryNotifier::default()),
        router.clone(),
        Arc::new(ManualClock::new(0)),
        listener.clone(),
    ));
    let ingester = CallEventIngester::new(state.clone(), router, end_handler, listener);
    let (events, _task) = ingester.spawn(8);

    let a = CallRecord::incoming(CallState::Ringing);
    events.send(CallEvent::CallAdded(a.clone())).await.unwrap();
    // Both are ignored and reported to the listener.
    events.send(CallEvent::CallAdded(a.clone())).await.unwrap();
    events
        .send(CallEvent::StateChanged(CallId::new(), CallState::Active))
        .await
        .unwrap();
    events
        .send(CallEvent::StateChanged(a.id, CallState::Active))
        .await
        .unwrap();

    let mut rx = state.subscribe();
    tokio::time::timeout(
        Duration::from_secs(1),
        rx.wait_for(|snapshot| {
            snapshot.calls.get(a.id).map(|call| call.state) == Some(CallState::Active)
        }),
    )
    .await
    .expect("event queue stalled")
    .unwrap();
    assert_eq!(state.snapshot().version(), 2);
}
