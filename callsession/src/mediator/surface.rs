use std::sync::Arc;

use callsession_telecom::AudioControlSurface;
use parking_lot::RwLock;

/// Holds at most one bound audio-control surface.
#[derive(Default)]
pub struct SurfaceSlot {
    current: RwLock<Option<Arc<dyn AudioControlSurface>>>,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `surface`, returning the one it replaced.
    pub fn bind(&self, surface: Arc<dyn AudioControlSurface>) -> Option<Arc<dyn AudioControlSurface>> {
        self.current.write().replace(surface)
    }

    pub fn unbind(&self) -> Option<Arc<dyn AudioControlSurface>> {
        self.current.write().take()
    }

    pub fn is_bound(&self) -> bool {
        self.current.read().is_some()
    }

    /// The surface bound right now. Callers use the returned handle without
    /// holding the slot lock.
    pub fn get(&self) -> Option<Arc<dyn AudioControlSurface>> {
        self.current.read().clone()
    }
}
