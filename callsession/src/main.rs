use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use callsession::clock::SystemClock;
use callsession::config::SessionConfig;
use callsession::notification::{
    NotificationAction, NotificationSink, OngoingNotification, OngoingNotificationService,
};
use callsession::router::TracingScreenSink;
use callsession::session::SessionSnapshot;
use callsession::storage::SqliteCallLog;
use callsession::{CallCoordinator, LoopbackTelephony};
use callsession_telecom::{DtmfTone, Telephony};
use tokio::sync::watch;
use tracing_subscriber::prelude::*;

struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn post(&self, notification: &OngoingNotification) {
        let labels: Vec<_> = notification.actions().iter().map(|(_, l)| *l).collect();
        tracing::info!(title = %notification.title, ?labels, "Notification posted");
    }

    fn cancel(&self) {
        tracing::info!("Notification cancelled");
    }
}

async fn wait_until<F>(
    rx: &mut watch::Receiver<SessionSnapshot>,
    f: F,
) -> Result<(), anyhow::Error>
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(f))
        .await
        .map_err(|_| anyhow!("Timed out waiting for call state"))?
        .map_err(|_| anyhow!("Call state closed"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("callsession.json"));
    let config = SessionConfig::load(&config_path).await?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let call_log = Arc::new(SqliteCallLog::open(&config.database_path()?).await?);
    let loopback = Arc::new(LoopbackTelephony::new(Arc::new(SystemClock)));
    let coordinator = CallCoordinator::builder(loopback.clone(), TracingScreenSink)
        .with_config(config)
        .with_call_log(call_log.clone())
        .build();
    loopback.attach(coordinator.events());
    coordinator.bind_surface(loopback.clone());
    let notification_task =
        OngoingNotificationService::spawn(coordinator.subscribe(), TracingNotificationSink);
    let notification = coordinator.notification_service();
    let actions = coordinator.actions();
    let mut rx = coordinator.subscribe();

    // Incoming call, answered.
    let alice = loopback.incoming_call("+15550101", Some("Alice"))?;
    wait_until(&mut rx, |s| s.calls.contains(alice)).await?;
    actions.accept().await;
    wait_until(&mut rx, |s| {
        s.calls.active_call().map(|c| c.id) == Some(alice)
    })
    .await?;
    actions.play_dtmf(DtmfTone::try_from('1')?).await;
    actions.stop_dtmf().await;
    notification.handle_action(NotificationAction::ToggleMute).await;
    notification.handle_action(NotificationAction::ToggleSpeaker).await;

    // Call waiting: the active call stays primary, so the waiting call is
    // answered on the subsystem side, which holds the first.
    let bob = loopback.incoming_call("+15550102", None)?;
    wait_until(&mut rx, |s| s.calls.contains(bob)).await?;
    loopback.answer(bob)?;
    wait_until(&mut rx, |s| s.can_swap()).await?;
    actions.swap().await;
    wait_until(&mut rx, |s| s.calls.active_call().map(|c| c.id) == Some(alice)).await?;

    // Merge into a conference, then hang up both legs.
    loopback.set_conferenceable(alice, &[bob])?;
    wait_until(&mut rx, |s| s.can_merge()).await?;
    actions.merge().await;
    wait_until(&mut rx, |s| s.calls.holding_call().is_none()).await?;
    actions.disconnect().await;
    wait_until(&mut rx, |s| !s.calls.contains(alice)).await?;
    notification.handle_action(NotificationAction::EndCall).await;
    wait_until(&mut rx, |s| s.is_empty()).await?;

    // A call nobody picks up.
    let carol = loopback.incoming_call("+15550103", Some("Carol"))?;
    wait_until(&mut rx, |s| s.calls.contains(carol)).await?;
    loopback.remote_hangup(carol)?;
    wait_until(&mut rx, |s| s.is_empty()).await?;

    // Let the call log catch up before reading it back.
    tokio::time::sleep(Duration::from_millis(200)).await;
    for entry in call_log.all().await? {
        tracing::info!(
            id = entry.id,
            number = %entry.phone_number,
            direction = %entry.direction,
            duration = entry.duration_seconds,
            "Call log entry"
        );
    }
    drop(coordinator);
    notification_task.abort();
    Ok(())
}
