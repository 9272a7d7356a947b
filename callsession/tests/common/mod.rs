#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use callsession::SessionError;
use callsession::clock::ManualClock;
use callsession::ending::{CallEndHandler, CallLogSink, CallSummary, MissedCallNotifier};
use callsession::router::{Screen, ScreenSink, SurfaceRouter};
use callsession::session::{CallEventIngester, CallSessionState, SessionListener};
use parking_lot::Mutex;
use tokio::time::sleep;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(format!("{}=trace,callsession=trace", module_path!()))
        .try_init();
}

pub async fn wait_until<F>(mut f: F, tries: usize, delay: Duration) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..tries {
        if f() {
            return true;
        }
        sleep(delay).await;
    }
    false
}

#[derive(Clone, Default)]
pub struct RecordingScreens(Arc<Mutex<Vec<Screen>>>);

impl RecordingScreens {
    pub fn screens(&self) -> Vec<Screen> {
        self.0.lock().clone()
    }

    pub fn last(&self) -> Option<Screen> {
        self.0.lock().last().copied()
    }
}

impl ScreenSink for RecordingScreens {
    fn route_to(&self, screen: Screen) {
        self.0.lock().push(screen);
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub rejected: Mutex<Vec<String>>,
    pub inconsistent: Mutex<Vec<String>>,
    pub collaborator: Mutex<Vec<String>>,
}

#[async_trait]
impl SessionListener for RecordingListener {
    async fn on_action_rejected(&self, error: &SessionError) {
        self.rejected.lock().push(error.to_string());
    }

    async fn on_inconsistent_event(&self, error: &SessionError) {
        self.inconsistent.lock().push(error.to_string());
    }

    async fn on_collaborator_failure(&self, error: &SessionError) {
        self.collaborator.lock().push(error.to_string());
    }
}

/// Call log kept in memory; can be told to fail the next few writes.
#[derive(Default)]
pub struct MemoryCallLog {
    entries: Mutex<Vec<CallSummary>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl MemoryCallLog {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<CallSummary> {
        self.entries.lock().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallLogSink for MemoryCallLog {
    async fn persist(&self, summary: &CallSummary) -> Result<i64, anyhow::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow!("disk full"));
        }
        let mut entries = self.entries.lock();
        entries.push(summary.clone());
        Ok(entries.len() as i64)
    }
}

#[derive(Default)]
pub struct MemoryNotifier {
    notified: Mutex<Vec<(Option<String>, String)>>,
    fail: AtomicBool,
}

impl MemoryNotifier {
    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn notified(&self) -> Vec<(Option<String>, String)> {
        self.notified.lock().clone()
    }
}

#[async_trait]
impl MissedCallNotifier for MemoryNotifier {
    async fn notify_missed_call(
        &self,
        display_name: Option<&str>,
        number: &str,
    ) -> Result<(), anyhow::Error> {
        self.notified
            .lock()
            .push((display_name.map(str::to_string), number.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("notification channel disabled"));
        }
        Ok(())
    }
}

/// An ingester driven directly, without its task, plus the fakes around it.
pub struct Harness {
    pub state: Arc<CallSessionState>,
    pub ingester: CallEventIngester,
    pub router: Arc<SurfaceRouter>,
    pub end_handler: Arc<CallEndHandler>,
    pub screens: RecordingScreens,
    pub listener: Arc<RecordingListener>,
    pub call_log: Arc<MemoryCallLog>,
    pub notifier: Arc<MemoryNotifier>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_collaborators(MemoryCallLog::default(), MemoryNotifier::default())
    }

    pub fn with_collaborators(call_log: MemoryCallLog, notifier: MemoryNotifier) -> Self {
        let state = Arc::new(CallSessionState::new());
        let screens = RecordingScreens::default();
        let router = Arc::new(SurfaceRouter::new(screens.clone()));
        let listener = Arc::new(RecordingListener::default());
        let call_log = Arc::new(call_log);
        let notifier = Arc::new(notifier);
        let clock = Arc::new(ManualClock::new(1_000_000));
        let end_handler = Arc::new(
            CallEndHandler::new(
                state.clone(),
                call_log.clone(),
                notifier.clone(),
                router.clone(),
                clock.clone(),
                listener.clone(),
            )
            .with_retry(3, Duration::from_millis(1)),
        );
        let ingester = CallEventIngester::new(
            state.clone(),
            router.clone(),
            end_handler.clone(),
            listener.clone(),
        );
        Self {
            state,
            ingester,
            router,
            end_handler,
            screens,
            listener,
            call_log,
            notifier,
            clock,
        }
    }
}
