use callsession_telecom::{AudioRoute, RouteMask};

/// Current audio routing as reported by the subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioState {
    pub route: AudioRoute,
    pub supported_routes: RouteMask,
    pub is_muted: bool,
}

impl AudioState {
    pub fn new(route: AudioRoute, supported_routes: RouteMask, is_muted: bool) -> Self {
        Self {
            route,
            supported_routes,
            is_muted,
        }
    }

    pub fn is_speaker(&self) -> bool {
        self.route == AudioRoute::Speaker
    }
}
