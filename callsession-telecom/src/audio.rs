use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioRoute {
    #[default]
    Earpiece,
    Speaker,
    Bluetooth,
    WiredHeadset,
}

impl AudioRoute {
    pub const ALL: [AudioRoute; 4] = [
        AudioRoute::Earpiece,
        AudioRoute::Speaker,
        AudioRoute::Bluetooth,
        AudioRoute::WiredHeadset,
    ];

    pub fn bit(&self) -> u8 {
        match self {
            AudioRoute::Earpiece => 0x01,
            AudioRoute::Bluetooth => 0x02,
            AudioRoute::WiredHeadset => 0x04,
            AudioRoute::Speaker => 0x08,
        }
    }
}

/// Set of audio routes currently available on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RouteMask(u8);

impl RouteMask {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn with(mut self, route: AudioRoute) -> Self {
        self.0 |= route.bit();
        self
    }

    pub fn supports(&self, route: AudioRoute) -> bool {
        self.0 & route.bit() != 0
    }

    pub fn routes(&self) -> impl Iterator<Item = AudioRoute> + '_ {
        AudioRoute::ALL
            .into_iter()
            .filter(move |route| self.supports(*route))
    }
}

impl FromIterator<AudioRoute> for RouteMask {
    fn from_iter<T: IntoIterator<Item = AudioRoute>>(iter: T) -> Self {
        iter.into_iter().fold(Self::empty(), RouteMask::with)
    }
}
