use crate::{CallId, CallState};

/// Refusal reported by the telephony subsystem for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelecomError {
    #[error("permission denied for {0}")]
    PermissionDenied(&'static str),
    #[error("cannot {op} call {call} in state {state}")]
    InvalidState {
        call: CallId,
        state: CallState,
        op: &'static str,
    },
    #[error("unknown call {0}")]
    UnknownCall(CallId),
    #[error("invalid DTMF tone {0:?}")]
    InvalidTone(char),
    #[error("telephony unavailable: {0}")]
    Unavailable(String),
}
