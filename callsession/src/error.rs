use callsession_telecom::TelecomError;

/// Everything that can go wrong inside the coordinator.
///
/// None of these are fatal: each kind is logged, reported to the
/// [`SessionListener`](crate::session::SessionListener) and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A mediated action was refused by the telephony subsystem.
    #[error("{action} rejected: {source}")]
    SubsystemRejected {
        action: &'static str,
        #[source]
        source: TelecomError,
    },
    /// An event does not fit the current call list.
    #[error("inconsistent {event} event: {reason}")]
    InconsistentEvent { event: &'static str, reason: String },
    /// Call-log persistence or missed-call notification failed.
    #[error("{collaborator} failed: {source:#}")]
    CollaboratorFailure {
        collaborator: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("call event queue is closed")]
    QueueClosed,
}

impl SessionError {
    pub(crate) fn inconsistent(event: &'static str, reason: impl Into<String>) -> Self {
        Self::InconsistentEvent {
            event,
            reason: reason.into(),
        }
    }

    pub(crate) fn collaborator(collaborator: &'static str, source: anyhow::Error) -> Self {
        Self::CollaboratorFailure {
            collaborator,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_collaborator_failure_keeps_source() {
        let err = SessionError::collaborator("call_log", anyhow!("disk full").context("insert"));
        assert_eq!(err.to_string(), "call_log failed: insert: disk full");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "insert");
        assert!(matches!(
            err,
            SessionError::CollaboratorFailure {
                collaborator: "call_log",
                ..
            }
        ));
    }
}
