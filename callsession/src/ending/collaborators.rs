use async_trait::async_trait;

use super::CallSummary;

/// Call-history persistence.
#[async_trait]
pub trait CallLogSink: Send + Sync {
    /// Stores the finished call and returns the log row id.
    async fn persist(&self, summary: &CallSummary) -> Result<i64, anyhow::Error>;
}

/// Missed-call notification surface.
#[async_trait]
pub trait MissedCallNotifier: Send + Sync {
    async fn notify_missed_call(
        &self,
        display_name: Option<&str>,
        number: &str,
    ) -> Result<(), anyhow::Error>;
}

pub struct TracingMissedCallNotifier;

#[async_trait]
impl MissedCallNotifier for TracingMissedCallNotifier {
    async fn notify_missed_call(
        &self,
        display_name: Option<&str>,
        number: &str,
    ) -> Result<(), anyhow::Error> {
        tracing::info!(?display_name, number, "Missed call");
        Ok(())
    }
}

/// Sink for setups without call history; hands out increasing ids.
#[derive(Default)]
pub struct DiscardCallLog {
    next_id: std::sync::atomic::AtomicI64,
}

#[async_trait]
impl CallLogSink for DiscardCallLog {
    async fn persist(&self, summary: &CallSummary) -> Result<i64, anyhow::Error> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        tracing::debug!(id, call_id = %summary.call_id, "Discarding call log entry");
        Ok(id)
    }
}
