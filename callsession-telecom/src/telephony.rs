use crate::{AudioRoute, CallId, DtmfTone, TelecomError};

/// Outbound per-call operations of the telephony subsystem.
///
/// Every method is a request: returning `Ok` means the subsystem accepted it,
/// the resulting state change is reported later as an event.
pub trait Telephony: Send + Sync {
    fn answer(&self, call: CallId) -> Result<(), TelecomError>;

    fn reject(&self, call: CallId) -> Result<(), TelecomError>;

    fn disconnect(&self, call: CallId) -> Result<(), TelecomError>;

    fn hold(&self, call: CallId) -> Result<(), TelecomError>;

    fn unhold(&self, call: CallId) -> Result<(), TelecomError>;

    /// Ask `call` to form a conference with `other`.
    fn conference(&self, call: CallId, other: CallId) -> Result<(), TelecomError>;

    fn play_dtmf(&self, call: CallId, tone: DtmfTone) -> Result<(), TelecomError>;

    fn stop_dtmf(&self, call: CallId) -> Result<(), TelecomError>;
}

/// The component currently allowed to change mute and audio routing.
pub trait AudioControlSurface: Send + Sync {
    fn set_muted(&self, muted: bool) -> Result<(), TelecomError>;

    fn set_audio_route(&self, route: AudioRoute) -> Result<(), TelecomError>;
}
