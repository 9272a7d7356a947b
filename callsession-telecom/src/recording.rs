use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{AudioControlSurface, AudioRoute, CallId, DtmfTone, TelecomError, Telephony};

/// One outbound request, as seen by the subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelecomRequest {
    Answer(CallId),
    Reject(CallId),
    Disconnect(CallId),
    Hold(CallId),
    Unhold(CallId),
    Conference(CallId, CallId),
    PlayDtmf(CallId, DtmfTone),
    StopDtmf(CallId),
    SetMuted(bool),
    SetAudioRoute(AudioRoute),
}

impl TelecomRequest {
    pub fn op(&self) -> &'static str {
        match self {
            TelecomRequest::Answer(_) => "answer",
            TelecomRequest::Reject(_) => "reject",
            TelecomRequest::Disconnect(_) => "disconnect",
            TelecomRequest::Hold(_) => "hold",
            TelecomRequest::Unhold(_) => "unhold",
            TelecomRequest::Conference(_, _) => "conference",
            TelecomRequest::PlayDtmf(_, _) => "play_dtmf",
            TelecomRequest::StopDtmf(_) => "stop_dtmf",
            TelecomRequest::SetMuted(_) => "set_muted",
            TelecomRequest::SetAudioRoute(_) => "set_audio_route",
        }
    }
}

/// Shared request log used by the recording fakes.
#[derive(Default)]
struct RequestLog {
    requests: Mutex<Vec<TelecomRequest>>,
    refusals: Mutex<HashMap<&'static str, TelecomError>>,
}

impl RequestLog {
    fn record(&self, request: TelecomRequest) -> Result<(), TelecomError> {
        tracing::trace!(?request, "Recording telecom request");
        let op = request.op();
        self.requests.lock().push(request);
        match self.refusals.lock().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Telephony fake that records every request in arrival order.
///
/// Requests are recorded even when refused, so tests can assert both on what
/// was attempted and on how refusals were absorbed.
#[derive(Default)]
pub struct RecordingTelephony {
    log: RequestLog,
}

impl RecordingTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<TelecomRequest> {
        self.log.requests.lock().clone()
    }

    pub fn take_requests(&self) -> Vec<TelecomRequest> {
        std::mem::take(&mut *self.log.requests.lock())
    }

    /// Refuse every future request with the given op name (see [`TelecomRequest::op`]).
    pub fn refuse(&self, op: &'static str, err: TelecomError) {
        self.log.refusals.lock().insert(op, err);
    }

    pub fn clear_refusals(&self) {
        self.log.refusals.lock().clear();
    }
}

impl Telephony for RecordingTelephony {
    fn answer(&self, call: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::Answer(call))
    }

    fn reject(&self, call: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::Reject(call))
    }

    fn disconnect(&self, call: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::Disconnect(call))
    }

    fn hold(&self, call: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::Hold(call))
    }

    fn unhold(&self, call: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::Unhold(call))
    }

    fn conference(&self, call: CallId, other: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::Conference(call, other))
    }

    fn play_dtmf(&self, call: CallId, tone: DtmfTone) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::PlayDtmf(call, tone))
    }

    fn stop_dtmf(&self, call: CallId) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::StopDtmf(call))
    }
}

/// Audio-control fake that records mute and route requests.
#[derive(Default)]
pub struct RecordingSurface {
    log: RequestLog,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<TelecomRequest> {
        self.log.requests.lock().clone()
    }

    pub fn refuse(&self, op: &'static str, err: TelecomError) {
        self.log.refusals.lock().insert(op, err);
    }
}

impl AudioControlSurface for RecordingSurface {
    fn set_muted(&self, muted: bool) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::SetMuted(muted))
    }

    fn set_audio_route(&self, route: AudioRoute) -> Result<(), TelecomError> {
        self.log.record(TelecomRequest::SetAudioRoute(route))
    }
}
