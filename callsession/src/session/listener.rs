use async_trait::async_trait;

use crate::error::SessionError;

/// Receives the non-fatal notices the coordinator absorbs.
///
/// A UI would surface `on_action_rejected` as a short, non-blocking message.
///
/// Event and collaborator notices arrive on their own tasks, so a slow
/// listener never holds up the event queue. A rejection is awaited by the
/// action that caused it.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_action_rejected(&self, error: &SessionError);

    async fn on_inconsistent_event(&self, error: &SessionError);

    async fn on_collaborator_failure(&self, error: &SessionError);
}

pub struct StubListener;

#[async_trait]
impl SessionListener for StubListener {
    async fn on_action_rejected(&self, _error: &SessionError) {}

    async fn on_inconsistent_event(&self, _error: &SessionError) {}

    async fn on_collaborator_failure(&self, _error: &SessionError) {}
}
