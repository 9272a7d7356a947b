use std::collections::HashMap;
use std::sync::Arc;

use callsession_telecom::{
    AudioControlSurface, AudioRoute, CallDirection, CallId, CallState, Capabilities, DtmfTone,
    RouteMask, TelecomError, Telephony,
};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::models::{AudioState, CallRecord};
use crate::session::{CallEvent, EventSender};

/// In-process stand-in for the telephony subsystem.
///
/// Accepted requests are answered with the events a real subsystem would
/// report, delivered through the attached [`EventSender`].
pub struct LoopbackTelephony {
    events: Mutex<Option<EventSender>>,
    inner: Mutex<LoopbackInner>,
    clock: Arc<dyn Clock>,
}

struct LoopbackInner {
    calls: HashMap<CallId, CallRecord>,
    audio: AudioState,
}

impl LoopbackTelephony {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let routes: RouteMask = [AudioRoute::Earpiece, AudioRoute::Speaker]
            .into_iter()
            .collect();
        Self {
            events: Mutex::new(None),
            inner: Mutex::new(LoopbackInner {
                calls: HashMap::new(),
                audio: AudioState::new(AudioRoute::Earpiece, routes, false),
            }),
            clock,
        }
    }

    pub fn attach(&self, events: EventSender) {
        *self.events.lock() = Some(events);
    }

    /// A remote party calls in; the call starts ringing.
    pub fn incoming_call(
        &self,
        number: &str,
        display_name: Option<&str>,
    ) -> Result<CallId, TelecomError> {
        let mut record = CallRecord::new(CallId::new(), CallDirection::Incoming, CallState::Ringing)
            .with_creation_time(self.clock.now_millis())
            .with_handle(number)
            .with_capabilities(Capabilities::HOLD | Capabilities::SUPPORT_HOLD | Capabilities::MUTE);
        if let Some(name) = display_name {
            record = record.with_display_name(name);
        }
        self.add(record)
    }

    /// The user dials out; the call starts dialing.
    pub fn outgoing_call(&self, number: &str) -> Result<CallId, TelecomError> {
        let record = CallRecord::new(CallId::new(), CallDirection::Outgoing, CallState::Dialing)
            .with_creation_time(self.clock.now_millis())
            .with_handle(number)
            .with_capabilities(Capabilities::HOLD | Capabilities::SUPPORT_HOLD | Capabilities::MUTE);
        self.add(record)
    }

    /// The remote party picks up an outgoing call.
    pub fn remote_answer(&self, call: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        let record = Self::expect_state(&mut inner, call, "remote_answer", &[
            CallState::Dialing,
            CallState::Connecting,
        ])?;
        record.connect_time = self.clock.now_millis();
        record.state = CallState::Active;
        let details = record.details();
        self.emit(CallEvent::DetailsChanged(call, details))?;
        self.emit(CallEvent::StateChanged(call, CallState::Active))
    }

    /// The remote party hangs up.
    pub fn remote_hangup(&self, call: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        self.end(&mut inner, call)
    }

    /// Marks two calls as able to form a conference, as seen from `call`.
    pub fn set_conferenceable(&self, call: CallId, others: &[CallId]) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        let record = inner
            .calls
            .get_mut(&call)
            .ok_or(TelecomError::UnknownCall(call))?;
        record.conferenceable = others.iter().copied().collect();
        self.emit(CallEvent::ConferenceableChanged(call, others.to_vec()))
    }

    pub fn call_state(&self, call: CallId) -> Option<CallState> {
        self.inner.lock().calls.get(&call).map(|record| record.state)
    }

    fn add(&self, record: CallRecord) -> Result<CallId, TelecomError> {
        let id = record.id;
        let mut inner = self.inner.lock();
        let first = inner.calls.is_empty();
        inner.calls.insert(id, record.clone());
        self.emit(CallEvent::CallAdded(record))?;
        if first {
            self.emit(CallEvent::AudioStateChanged(inner.audio))?;
        }
        Ok(id)
    }

    fn end(&self, inner: &mut LoopbackInner, call: CallId) -> Result<(), TelecomError> {
        let record = inner
            .calls
            .remove(&call)
            .ok_or(TelecomError::UnknownCall(call))?;
        if record.state != CallState::Disconnected {
            self.emit(CallEvent::StateChanged(call, CallState::Disconnected))?;
        }
        self.emit(CallEvent::CallRemoved(call))
    }

    fn set_state(
        &self,
        call: CallId,
        op: &'static str,
        from: &[CallState],
        to: CallState,
    ) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        let record = Self::expect_state(&mut inner, call, op, from)?;
        record.state = to;
        self.emit(CallEvent::StateChanged(call, to))
    }

    fn expect_state<'a>(
        inner: &'a mut LoopbackInner,
        call: CallId,
        op: &'static str,
        allowed: &[CallState],
    ) -> Result<&'a mut CallRecord, TelecomError> {
        let record = inner
            .calls
            .get_mut(&call)
            .ok_or(TelecomError::UnknownCall(call))?;
        if !allowed.contains(&record.state) {
            return Err(TelecomError::InvalidState {
                call,
                state: record.state,
                op,
            });
        }
        Ok(record)
    }

    fn emit(&self, event: CallEvent) -> Result<(), TelecomError> {
        let events = self.events.lock();
        let Some(events) = events.as_ref() else {
            return Err(TelecomError::Unavailable("loopback not attached".to_string()));
        };
        tracing::trace!(event = event.kind(), call_id = ?event.call_id(), "Loopback event");
        events
            .try_send(event)
            .map_err(|err| TelecomError::Unavailable(err.to_string()))
    }
}

impl Telephony for LoopbackTelephony {
    fn answer(&self, call: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        Self::expect_state(&mut inner, call, "answer", &[CallState::Ringing])?;
        // Answering a waiting call puts the current one on hold.
        let active: Vec<CallId> = inner
            .calls
            .values()
            .filter(|record| record.state == CallState::Active)
            .map(|record| record.id)
            .collect();
        for other in active {
            if let Some(record) = inner.calls.get_mut(&other) {
                record.state = CallState::Holding;
            }
            self.emit(CallEvent::StateChanged(other, CallState::Holding))?;
        }
        let now = self.clock.now_millis();
        let record = Self::expect_state(&mut inner, call, "answer", &[CallState::Ringing])?;
        record.connect_time = now;
        record.state = CallState::Active;
        let details = record.details();
        self.emit(CallEvent::DetailsChanged(call, details))?;
        self.emit(CallEvent::StateChanged(call, CallState::Active))
    }

    fn reject(&self, call: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        Self::expect_state(&mut inner, call, "reject", &[CallState::Ringing])?;
        self.end(&mut inner, call)
    }

    fn disconnect(&self, call: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        self.end(&mut inner, call)
    }

    fn hold(&self, call: CallId) -> Result<(), TelecomError> {
        self.set_state(call, "hold", &[CallState::Active], CallState::Holding)
    }

    fn unhold(&self, call: CallId) -> Result<(), TelecomError> {
        self.set_state(call, "unhold", &[CallState::Holding], CallState::Active)
    }

    fn conference(&self, call: CallId, other: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        let live = [CallState::Active, CallState::Holding];
        Self::expect_state(&mut inner, call, "conference", &live)?;
        Self::expect_state(&mut inner, other, "conference", &live)?;
        for id in [call, other] {
            let record = Self::expect_state(&mut inner, id, "conference", &live)?;
            record.conferenceable.clear();
            record.capabilities.remove(Capabilities::MERGE_CONFERENCE);
            let was_holding = record.state == CallState::Holding;
            record.state = CallState::Active;
            let details = record.details();
            self.emit(CallEvent::ConferenceableChanged(id, Vec::new()))?;
            self.emit(CallEvent::DetailsChanged(id, details))?;
            if was_holding {
                self.emit(CallEvent::StateChanged(id, CallState::Active))?;
            }
        }
        Ok(())
    }

    fn play_dtmf(&self, call: CallId, tone: DtmfTone) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        Self::expect_state(&mut inner, call, "play_dtmf", &[CallState::Active])?;
        tracing::debug!(call_id = %call, %tone, "Playing DTMF tone");
        Ok(())
    }

    fn stop_dtmf(&self, call: CallId) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        Self::expect_state(&mut inner, call, "stop_dtmf", &[CallState::Active])?;
        tracing::debug!(call_id = %call, "Stopped DTMF tone");
        Ok(())
    }
}

impl AudioControlSurface for LoopbackTelephony {
    fn set_muted(&self, muted: bool) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        inner.audio.is_muted = muted;
        self.emit(CallEvent::AudioStateChanged(inner.audio))
    }

    fn set_audio_route(&self, route: AudioRoute) -> Result<(), TelecomError> {
        let mut inner = self.inner.lock();
        if !inner.audio.supported_routes.supports(route) {
            return Err(TelecomError::Unavailable(format!(
                "audio route {route:?} is not available"
            )));
        }
        inner.audio.route = route;
        self.emit(CallEvent::AudioStateChanged(inner.audio))
    }
}
