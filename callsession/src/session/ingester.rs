use std::collections::HashSet;
use std::sync::Arc;

use callsession_telecom::{CallDirection, CallId, CallState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ending::CallEndHandler;
use crate::error::SessionError;
use crate::models::{AudioState, CallDetails, CallRecord};
use crate::router::SurfaceRouter;

use super::{CallSessionState, SessionListener};

/// Notification from the telephony subsystem.
#[derive(Debug, Clone)]
pub enum CallEvent {
    CallAdded(CallRecord),
    CallRemoved(CallId),
    StateChanged(CallId, CallState),
    DetailsChanged(CallId, CallDetails),
    ConferenceableChanged(CallId, Vec<CallId>),
    AudioStateChanged(AudioState),
}

impl CallEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CallEvent::CallAdded(_) => "call_added",
            CallEvent::CallRemoved(_) => "call_removed",
            CallEvent::StateChanged(_, _) => "state_changed",
            CallEvent::DetailsChanged(_, _) => "details_changed",
            CallEvent::ConferenceableChanged(_, _) => "conferenceable_changed",
            CallEvent::AudioStateChanged(_) => "audio_state_changed",
        }
    }

    pub fn call_id(&self) -> Option<CallId> {
        match self {
            CallEvent::CallAdded(record) => Some(record.id),
            CallEvent::CallRemoved(id)
            | CallEvent::StateChanged(id, _)
            | CallEvent::DetailsChanged(id, _)
            | CallEvent::ConferenceableChanged(id, _) => Some(*id),
            CallEvent::AudioStateChanged(_) => None,
        }
    }
}

/// Cloneable entry point into the single event queue.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<CallEvent>,
}

impl EventSender {
    pub async fn send(&self, event: CallEvent) -> Result<(), SessionError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SessionError::QueueClosed)
    }

    /// Non-blocking send for subsystem adapters running outside async code.
    pub fn try_send(&self, event: CallEvent) -> Result<(), SessionError> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Closed(_) => SessionError::QueueClosed,
            mpsc::error::TrySendError::Full(event) => SessionError::inconsistent(
                event.kind(),
                "event queue is full, event dropped",
            ),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Applies subsystem events to the session state, one at a time, in arrival
/// order. The only writer of [`CallSessionState`].
pub struct CallEventIngester {
    state: Arc<CallSessionState>,
    router: Arc<SurfaceRouter>,
    end_handler: Arc<CallEndHandler>,
    listener: Arc<dyn SessionListener>,
    // Calls already handed to the end handler.
    ended: HashSet<CallId>,
}

impl CallEventIngester {
    pub fn new(
        state: Arc<CallSessionState>,
        router: Arc<SurfaceRouter>,
        end_handler: Arc<CallEndHandler>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            state,
            router,
            end_handler,
            listener,
            ended: HashSet::new(),
        }
    }

    /// Moves the ingester onto its own task. The task stops once every
    /// [`EventSender`] is dropped and the queue is drained.
    pub fn spawn(self, capacity: usize) -> (EventSender, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(self.run(rx));
        (EventSender { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<CallEvent>) {
        tracing::debug!("Call event ingester started");
        while let Some(event) = rx.recv().await {
            self.apply(event).await;
        }
        tracing::debug!("Call event ingester stopped");
    }

    pub async fn apply(&mut self, event: CallEvent) {
        let kind = event.kind();
        let call_id = event.call_id();
        let result = match event {
            CallEvent::CallAdded(record) => self.on_call_added(record),
            CallEvent::CallRemoved(id) => self.on_call_removed(id),
            CallEvent::StateChanged(id, new_state) => self.on_state_changed(id, new_state),
            CallEvent::DetailsChanged(id, details) => self
                .state
                .touch_call(kind, id, |record| record.apply_details(details))
                .map(|_| ()),
            CallEvent::ConferenceableChanged(id, calls) => self
                .state
                .touch_call(kind, id, |record| {
                    record.conferenceable = calls.into_iter().filter(|other| *other != id).collect()
                })
                .map(|_| ()),
            CallEvent::AudioStateChanged(audio) => {
                self.state.set_audio(audio);
                Ok(())
            }
        };
        match result {
            Ok(()) => {
                tracing::debug!(
                    event = kind,
                    ?call_id,
                    version = self.state.snapshot().version(),
                    "Applied call event"
                );
            }
            Err(err) => {
                tracing::warn!(event = kind, ?call_id, %err, "Ignoring call event");
                // Never hold the queue up for a listener.
                let listener = self.listener.clone();
                tokio::spawn(async move {
                    listener.on_inconsistent_event(&err).await;
                });
            }
        }
    }

    fn on_call_added(&mut self, record: CallRecord) -> Result<(), SessionError> {
        let id = record.id;
        let snapshot = self.state.add_call(record)?;
        self.router.route_snapshot(&snapshot);
        if let Some(record) = snapshot.calls.get(id) {
            if record.state == CallState::Disconnected {
                self.hand_off(record.clone());
            }
        }
        Ok(())
    }

    fn on_state_changed(&mut self, id: CallId, new_state: CallState) -> Result<(), SessionError> {
        let snapshot = self
            .state
            .touch_call("state_changed", id, |record| record.state = new_state)?;
        self.router.route_snapshot(&snapshot);
        if new_state == CallState::Disconnected {
            if let Some(record) = snapshot.calls.get(id) {
                self.hand_off(record.clone());
            }
        }
        Ok(())
    }

    fn on_call_removed(&mut self, id: CallId) -> Result<(), SessionError> {
        let (record, snapshot) = self.state.remove_call(id)?;
        if !self.ended.remove(&id) {
            // Removed without a Disconnected event; file it with what we last saw.
            if record.state != CallState::Disconnected {
                tracing::warn!(call_id = %id, state = %record.state, "Call removed before it disconnected");
            }
            self.dispatch_end(record);
        }
        self.router.route_snapshot(&snapshot);
        Ok(())
    }

    fn hand_off(&mut self, record: CallRecord) {
        if self.ended.insert(record.id) {
            self.dispatch_end(record);
        } else {
            tracing::trace!(call_id = %record.id, "Call end already handled");
        }
    }

    fn dispatch_end(&self, record: CallRecord) {
        let missed_hint = record.direction == CallDirection::Incoming && record.connect_time == 0;
        self.end_handler.on_call_ended(record, missed_hint);
    }
}
