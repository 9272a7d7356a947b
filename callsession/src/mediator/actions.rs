use std::sync::Arc;

use callsession_telecom::{
    AudioControlSurface, AudioRoute, CallId, CallState, DtmfTone, TelecomError, Telephony,
};

use crate::error::SessionError;
use crate::session::{CallSessionState, MergeEligibility, SessionListener, SessionSnapshot};

use super::SurfaceSlot;

/// Turns user intent into telephony requests.
///
/// Nothing here mutates session state: effects show up when the subsystem
/// reports them back through the event ingester. Refused requests are logged
/// and reported to the listener, never returned to the caller.
pub struct CallActionMediator {
    telephony: Arc<dyn Telephony>,
    state: Arc<CallSessionState>,
    surface: SurfaceSlot,
    listener: Arc<dyn SessionListener>,
}

impl CallActionMediator {
    pub fn new(
        telephony: Arc<dyn Telephony>,
        state: Arc<CallSessionState>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            telephony,
            state,
            surface: SurfaceSlot::new(),
            listener,
        }
    }

    /// Binds the audio-control surface, replacing any previous one.
    pub fn bind_surface(&self, surface: Arc<dyn AudioControlSurface>) {
        if self.surface.bind(surface).is_some() {
            tracing::debug!("Replaced bound audio-control surface");
        } else {
            tracing::debug!("Bound audio-control surface");
        }
    }

    pub fn unbind_surface(&self) {
        if self.surface.unbind().is_some() {
            tracing::debug!("Unbound audio-control surface");
        }
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_bound()
    }

    pub async fn accept(&self) {
        if let Some(id) = self.primary_id("accept") {
            let result = self.telephony.answer(id);
            self.report("accept", result).await;
        }
    }

    pub async fn reject(&self) {
        if let Some(id) = self.primary_id("reject") {
            let result = self.telephony.reject(id);
            self.report("reject", result).await;
        }
    }

    pub async fn disconnect(&self) {
        if let Some(id) = self.primary_id("disconnect") {
            let result = self.telephony.disconnect(id);
            self.report("disconnect", result).await;
        }
    }

    /// Unholds the primary call if it is on hold, holds it otherwise.
    pub async fn hold_toggle(&self) {
        let snapshot = self.state.snapshot();
        let Some(primary) = snapshot.primary_call() else {
            tracing::debug!(action = "hold_toggle", "No primary call");
            return;
        };
        if primary.state == CallState::Holding {
            let result = self.telephony.unhold(primary.id);
            self.report("unhold", result).await;
        } else {
            let result = self.telephony.hold(primary.id);
            self.report("hold", result).await;
        }
    }

    /// Holds the active call and resumes the held one.
    pub async fn swap(&self) {
        let snapshot = self.state.snapshot();
        let (Some(active), Some(holding)) =
            (snapshot.calls.active_call(), snapshot.calls.holding_call())
        else {
            tracing::debug!(action = "swap", "Nothing to swap");
            return;
        };
        let result = self.telephony.hold(active.id);
        if !self.report("swap", result).await {
            // Resuming now would leave two active calls.
            return;
        }
        let result = self.telephony.unhold(holding.id);
        self.report("swap", result).await;
    }

    /// Conferences the active and held calls.
    ///
    /// The request goes out from whichever call lists the other as
    /// conferenceable. When only the merge capability says they may be merged,
    /// the active call asks for the conference.
    pub async fn merge(&self) {
        let snapshot = self.state.snapshot();
        let Some(candidates) = snapshot.calls.merge_candidates() else {
            tracing::debug!(action = "merge", "Calls cannot be merged");
            return;
        };
        let (from, to) = match candidates.eligibility {
            MergeEligibility::ConferenceableForward | MergeEligibility::CapabilityBit => {
                (candidates.active.id, candidates.holding.id)
            }
            MergeEligibility::ConferenceableBackward => {
                (candidates.holding.id, candidates.active.id)
            }
        };
        tracing::debug!(?from, ?to, eligibility = ?candidates.eligibility, "Merging calls");
        let result = self.telephony.conference(from, to);
        self.report("merge", result).await;
    }

    pub async fn set_muted(&self, muted: bool) {
        if let Some(surface) = self.bound_surface("set_muted") {
            let result = surface.set_muted(muted);
            self.report("set_muted", result).await;
        }
    }

    pub async fn toggle_mute(&self) {
        let muted = self.state.snapshot().is_muted();
        self.set_muted(!muted).await;
    }

    pub async fn set_audio_route(&self, route: AudioRoute) {
        if let Some(surface) = self.bound_surface("set_audio_route") {
            let result = surface.set_audio_route(route);
            self.report("set_audio_route", result).await;
        }
    }

    pub async fn toggle_speaker(&self, enabled: bool) {
        let route = if enabled {
            AudioRoute::Speaker
        } else {
            AudioRoute::Earpiece
        };
        self.set_audio_route(route).await;
    }

    pub async fn play_dtmf(&self, tone: DtmfTone) {
        if let Some(id) = self.primary_id("play_dtmf") {
            let result = self.telephony.play_dtmf(id, tone);
            self.report("play_dtmf", result).await;
        }
    }

    pub async fn stop_dtmf(&self) {
        if let Some(id) = self.primary_id("stop_dtmf") {
            let result = self.telephony.stop_dtmf(id);
            self.report("stop_dtmf", result).await;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    fn primary_id(&self, action: &'static str) -> Option<CallId> {
        let id = self.state.snapshot().primary_call().map(|call| call.id);
        if id.is_none() {
            tracing::debug!(action, "No primary call");
        }
        id
    }

    fn bound_surface(&self, action: &'static str) -> Option<Arc<dyn AudioControlSurface>> {
        let surface = self.surface.get();
        if surface.is_none() {
            tracing::debug!(action, "No audio-control surface bound, dropping request");
        }
        surface
    }

    /// Returns whether the subsystem accepted the request.
    async fn report(&self, action: &'static str, result: Result<(), TelecomError>) -> bool {
        match result {
            Ok(()) => true,
            Err(source) => {
                let err = SessionError::SubsystemRejected { action, source };
                tracing::warn!(%err, "Call action rejected");
                self.listener.on_action_rejected(&err).await;
                false
            }
        }
    }
}
