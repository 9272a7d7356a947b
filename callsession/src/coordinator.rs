use std::sync::Arc;

use callsession_telecom::{AudioControlSurface, Telephony};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::ending::{
    CallEndHandler, CallLogSink, DiscardCallLog, MissedCallNotifier, TracingMissedCallNotifier,
};
use crate::mediator::CallActionMediator;
use crate::notification::OngoingNotificationService;
use crate::router::{ScreenSink, SurfaceRouter};
use crate::session::{
    CallEventIngester, CallSessionState, EventSender, SessionListener, SessionSnapshot,
    StubListener,
};

/// The one call-state owner of the process.
///
/// Build it once at startup and hand out `Arc`s: the telephony adapter feeds
/// [`CallCoordinator::events`], screens and the notification subscribe, user
/// intent goes through [`CallCoordinator::actions`].
pub struct CallCoordinator {
    state: Arc<CallSessionState>,
    events: EventSender,
    mediator: Arc<CallActionMediator>,
    router: Arc<SurfaceRouter>,
    ingester_task: JoinHandle<()>,
}

impl CallCoordinator {
    pub fn builder<S>(telephony: Arc<dyn Telephony>, screens: S) -> CoordinatorBuilder
    where
        S: ScreenSink + 'static,
    {
        CoordinatorBuilder {
            telephony,
            router: SurfaceRouter::new(screens),
            config: SessionConfig::default(),
            call_log: Arc::new(DiscardCallLog::default()),
            notifier: Arc::new(TracingMissedCallNotifier),
            listener: Arc::new(StubListener),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Receiver that already holds the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn actions(&self) -> Arc<CallActionMediator> {
        self.mediator.clone()
    }

    pub fn router(&self) -> Arc<SurfaceRouter> {
        self.router.clone()
    }

    pub fn bind_surface(&self, surface: Arc<dyn AudioControlSurface>) {
        self.mediator.bind_surface(surface);
    }

    pub fn unbind_surface(&self) {
        self.mediator.unbind_surface();
    }

    pub fn notification_service(&self) -> OngoingNotificationService {
        OngoingNotificationService::new(self.mediator.clone(), self.router.clone())
    }
}

impl Drop for CallCoordinator {
    fn drop(&mut self) {
        self.ingester_task.abort();
        tracing::debug!("Call coordinator dropped");
    }
}

pub struct CoordinatorBuilder {
    telephony: Arc<dyn Telephony>,
    router: SurfaceRouter,
    config: SessionConfig,
    call_log: Arc<dyn CallLogSink>,
    notifier: Arc<dyn MissedCallNotifier>,
    listener: Arc<dyn SessionListener>,
    clock: Arc<dyn Clock>,
}

impl CoordinatorBuilder {
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_call_log(mut self, call_log: Arc<dyn CallLogSink>) -> Self {
        self.call_log = call_log;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn MissedCallNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wires everything up and starts the ingester task. Needs a tokio runtime.
    pub fn build(self) -> CallCoordinator {
        let state = Arc::new(CallSessionState::new());
        let router = Arc::new(self.router);
        let end_handler = CallEndHandler::new(
            state.clone(),
            self.call_log,
            self.notifier,
            router.clone(),
            self.clock,
            self.listener.clone(),
        )
        .with_retry(
            self.config.persist_attempts,
            self.config.persist_retry_delay(),
        );
        let ingester = CallEventIngester::new(
            state.clone(),
            router.clone(),
            Arc::new(end_handler),
            self.listener.clone(),
        );
        let (events, ingester_task) = ingester.spawn(self.config.event_queue_capacity);
        let mediator = Arc::new(CallActionMediator::new(
            self.telephony,
            state.clone(),
            self.listener,
        ));
        tracing::info!(
            queue_capacity = self.config.event_queue_capacity,
            "Call coordinator started"
        );
        CallCoordinator {
            state,
            events,
            mediator,
            router,
            ingester_task,
        }
    }
}
