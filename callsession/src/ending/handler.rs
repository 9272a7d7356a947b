use std::sync::Arc;
use std::time::Duration;

use callsession_telecom::{CallId, CallState};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::SessionError;
use crate::models::CallRecord;
use crate::router::{Screen, SurfaceRouter};
use crate::session::{CallSessionState, SessionListener};

use super::{CallClassification, CallLogSink, CallSummary, MissedCallNotifier};

/// Files finished calls: classifies them, persists them, notifies missed ones
/// and brings up the summary screen.
///
/// Persistence and notification run on their own task, so a slow or failing
/// collaborator never holds up the event ingester.
pub struct CallEndHandler {
    state: Arc<CallSessionState>,
    call_log: Arc<dyn CallLogSink>,
    notifier: Arc<dyn MissedCallNotifier>,
    router: Arc<SurfaceRouter>,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn SessionListener>,
    persist_attempts: u32,
    retry_delay: Duration,
}

impl CallEndHandler {
    pub fn new(
        state: Arc<CallSessionState>,
        call_log: Arc<dyn CallLogSink>,
        notifier: Arc<dyn MissedCallNotifier>,
        router: Arc<SurfaceRouter>,
        clock: Arc<dyn Clock>,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        Self {
            state,
            call_log,
            notifier,
            router,
            clock,
            listener,
            persist_attempts: 1,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.persist_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Hands the pre-removal snapshot of a finished call to the collaborators.
    ///
    /// `missed_hint` is what the caller inferred from the snapshot; the
    /// classification here is authoritative. The returned task resolves to
    /// the log id once the call is persisted.
    pub fn on_call_ended(&self, record: CallRecord, missed_hint: bool) -> JoinHandle<Option<i64>> {
        let summary = CallSummary::from_record(&record, self.clock.now_millis());
        if missed_hint != (summary.classification == CallClassification::Missed) {
            tracing::debug!(
                call_id = %record.id,
                missed_hint,
                classification = %summary.classification,
                "Missed hint differs from classification"
            );
        }
        tracing::info!(
            call_id = %summary.call_id,
            classification = %summary.classification,
            duration = summary.duration_seconds,
            "Call ended"
        );
        let state = self.state.clone();
        let call_log = self.call_log.clone();
        let notifier = self.notifier.clone();
        let router = self.router.clone();
        let listener = self.listener.clone();
        let attempts = self.persist_attempts;
        let retry_delay = self.retry_delay;
        tokio::spawn(async move {
            let notify = Self::notify_missed(notifier.as_ref(), listener.as_ref(), &summary);
            let persist = Self::persist(
                call_log.as_ref(),
                listener.as_ref(),
                &summary,
                attempts,
                retry_delay,
            );
            let ((), log_id) = tokio::join!(notify, persist);
            if let Some(log_id) = log_id {
                Self::show_summary(&state, &router, summary.call_id, log_id);
            }
            log_id
        })
    }

    /// The summary only comes up once no other call needs a screen.
    fn show_summary(
        state: &CallSessionState,
        router: &SurfaceRouter,
        call_id: CallId,
        log_id: i64,
    ) {
        let live = state
            .snapshot()
            .calls
            .calls
            .iter()
            .filter(|call| call.state != CallState::Disconnected)
            .count();
        if live > 0 {
            tracing::debug!(%call_id, log_id, live, "Other calls still live, skipping summary");
            return;
        }
        router.route_to(Screen::Summary(log_id));
    }

    async fn notify_missed(
        notifier: &dyn MissedCallNotifier,
        listener: &dyn SessionListener,
        summary: &CallSummary,
    ) {
        if summary.classification != CallClassification::Missed {
            return;
        }
        if summary.display_name.is_none() && summary.number.is_empty() {
            tracing::debug!(call_id = %summary.call_id, "Missed call without caller, not notifying");
            return;
        }
        if let Err(err) = notifier
            .notify_missed_call(summary.display_name.as_deref(), &summary.number)
            .await
        {
            let err = SessionError::collaborator("missed_call_notifier", err);
            tracing::warn!(call_id = %summary.call_id, %err, "Failed to notify missed call");
            listener.on_collaborator_failure(&err).await;
        }
    }

    async fn persist(
        call_log: &dyn CallLogSink,
        listener: &dyn SessionListener,
        summary: &CallSummary,
        attempts: u32,
        retry_delay: Duration,
    ) -> Option<i64> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call_log.persist(summary).await {
                Ok(log_id) => {
                    tracing::debug!(call_id = %summary.call_id, log_id, "Call logged");
                    return Some(log_id);
                }
                Err(err) if attempt < attempts => {
                    tracing::debug!(call_id = %summary.call_id, attempt, "Retrying call log: {err:#}");
                    tokio::time::sleep(retry_delay).await;
                }
                Err(err) => {
                    let err = SessionError::collaborator("call_log", err);
                    tracing::warn!(call_id = %summary.call_id, attempt, %err, "Giving up on call log");
                    listener.on_collaborator_failure(&err).await;
                    return None;
                }
            }
        }
    }
}
