use std::sync::Arc;

use callsession_telecom::{CallId, CallState};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::mediator::CallActionMediator;
use crate::router::{Screen, SurfaceRouter};
use crate::session::SessionSnapshot;

const FALLBACK_TITLE: &str = "Ongoing call";

/// Buttons on the persistent call notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationAction {
    ToggleMute,
    ToggleSpeaker,
    ToggleHold,
    OpenCall,
    EndCall,
}

/// What the persistent background notification shows for the primary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OngoingNotification {
    pub call_id: CallId,
    pub title: String,
    /// Base for a running timer, if the call has a start time.
    pub chronometer_base: Option<i64>,
    pub muted: bool,
    pub speaker: bool,
    pub on_hold: bool,
}

impl OngoingNotification {
    /// `None` when there is no call to show.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Option<Self> {
        let call = snapshot.primary_call()?;
        let title = match call.display_name() {
            Some(name) => name.to_string(),
            None if !call.number().is_empty() => call.number().to_string(),
            None => FALLBACK_TITLE.to_string(),
        };
        let start_time = call.start_time();
        Some(Self {
            call_id: call.id,
            title,
            chronometer_base: (start_time > 0).then_some(start_time),
            muted: snapshot.is_muted(),
            speaker: snapshot.is_speaker(),
            on_hold: call.state == CallState::Holding,
        })
    }

    /// Buttons in display order with their current labels.
    pub fn actions(&self) -> [(NotificationAction, &'static str); 5] {
        [
            (
                NotificationAction::ToggleMute,
                if self.muted { "Unmute" } else { "Mute" },
            ),
            (
                NotificationAction::ToggleSpeaker,
                if self.speaker { "Speaker off" } else { "Speaker" },
            ),
            (
                NotificationAction::ToggleHold,
                if self.on_hold { "Unhold" } else { "Hold" },
            ),
            (NotificationAction::OpenCall, "Return to call"),
            (NotificationAction::EndCall, "End call"),
        ]
    }
}

/// Where the notification is actually drawn.
pub trait NotificationSink: Send + Sync {
    fn post(&self, notification: &OngoingNotification);

    fn cancel(&self);
}

/// Keeps the persistent notification in sync with the session and carries out
/// its buttons.
pub struct OngoingNotificationService {
    mediator: Arc<CallActionMediator>,
    router: Arc<SurfaceRouter>,
}

impl OngoingNotificationService {
    pub fn new(mediator: Arc<CallActionMediator>, router: Arc<SurfaceRouter>) -> Self {
        Self { mediator, router }
    }

    /// Follows `rx` until the session state is dropped, reposting only when
    /// the rendered notification changes.
    pub fn spawn<S>(mut rx: watch::Receiver<SessionSnapshot>, sink: S) -> JoinHandle<()>
    where
        S: NotificationSink + 'static,
    {
        tokio::spawn(async move {
            let mut shown: Option<OngoingNotification> = None;
            loop {
                let next = OngoingNotification::from_snapshot(&rx.borrow_and_update());
                if next != shown {
                    match &next {
                        Some(notification) => sink.post(notification),
                        None => sink.cancel(),
                    }
                    shown = next;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("Ongoing notification stopped");
        })
    }

    pub async fn handle_action(&self, action: NotificationAction) {
        tracing::debug!(?action, "Notification action");
        match action {
            NotificationAction::EndCall => self.mediator.disconnect().await,
            NotificationAction::ToggleMute => self.mediator.toggle_mute().await,
            NotificationAction::ToggleSpeaker => {
                let speaker = self.mediator.snapshot().is_speaker();
                self.mediator.toggle_speaker(!speaker).await
            }
            NotificationAction::ToggleHold => self.mediator.hold_toggle().await,
            NotificationAction::OpenCall => {
                self.router.route_to(Screen::Ongoing);
            }
        }
    }
}
