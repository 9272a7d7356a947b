use callsession_telecom::CallState;
use parking_lot::Mutex;

use crate::session::SessionSnapshot;

/// Which call screen should be in front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Incoming,
    Ongoing,
    /// Post-call summary for the given call-log row.
    Summary(i64),
    /// No call screen; dismiss whatever is showing.
    None,
}

/// The UI side that actually brings screens to front.
pub trait ScreenSink: Send + Sync {
    fn route_to(&self, screen: Screen);
}

/// Screen for the current snapshot, `None` when the decision should not change.
pub fn screen_for(snapshot: &SessionSnapshot) -> Option<Screen> {
    let Some(primary) = snapshot.primary_call() else {
        return Some(Screen::None);
    };
    match primary.state {
        CallState::Ringing => Some(Screen::Incoming),
        CallState::New
        | CallState::Dialing
        | CallState::Connecting
        | CallState::Active
        | CallState::Holding
        | CallState::Disconnecting => Some(Screen::Ongoing),
        // The end handler routes to the summary once the call is logged.
        CallState::Disconnected => None,
    }
}

/// Forwards screen decisions to a [`ScreenSink`], dropping repeats.
pub struct SurfaceRouter {
    sink: Box<dyn ScreenSink>,
    current: Mutex<Option<Screen>>,
}

impl SurfaceRouter {
    pub fn new<S>(sink: S) -> Self
    where
        S: ScreenSink + 'static,
    {
        Self {
            sink: Box::new(sink),
            current: Mutex::new(None),
        }
    }

    /// Returns `true` if the request reached the sink.
    pub fn route_to(&self, screen: Screen) -> bool {
        let mut current = self.current.lock();
        if *current == Some(screen) {
            tracing::trace!(?screen, "Screen already in front");
            return false;
        }
        // Dismissal only concerns call screens; the summary stays until a new call.
        if screen == Screen::None && matches!(*current, Some(Screen::Summary(_))) {
            tracing::trace!("Keeping call summary in front");
            return false;
        }
        tracing::debug!(?screen, previous = ?*current, "Routing to screen");
        *current = Some(screen);
        self.sink.route_to(screen);
        true
    }

    pub fn route_snapshot(&self, snapshot: &SessionSnapshot) -> bool {
        match screen_for(snapshot) {
            Some(screen) => self.route_to(screen),
            None => false,
        }
    }

    pub fn current(&self) -> Option<Screen> {
        *self.current.lock()
    }
}

pub struct TracingScreenSink;

impl ScreenSink for TracingScreenSink {
    fn route_to(&self, screen: Screen) {
        tracing::info!(?screen, "Foreground screen changed");
    }
}
