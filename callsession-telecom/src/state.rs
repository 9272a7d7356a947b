use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Call state as reported by the telephony subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    New,
    Dialing,
    Connecting,
    Ringing,
    Active,
    Holding,
    Disconnecting,
    Disconnected,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::New => "new",
            CallState::Dialing => "dialing",
            CallState::Connecting => "connecting",
            CallState::Ringing => "ringing",
            CallState::Active => "active",
            CallState::Holding => "holding",
            CallState::Disconnecting => "disconnecting",
            CallState::Disconnected => "disconnected",
        }
    }

    /// Outgoing call still being set up.
    pub fn is_dialing(&self) -> bool {
        matches!(self, CallState::Dialing | CallState::Connecting)
    }

    pub fn is_terminal(&self) -> bool {
        *self == CallState::Disconnected
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallDirection {
    Incoming,
    Outgoing,
    #[default]
    Unknown,
}

/// Capability bits advertised by the subsystem for a single call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const HOLD: Self = Self(0x0000_0001);
    pub const SUPPORT_HOLD: Self = Self(0x0000_0002);
    pub const MERGE_CONFERENCE: Self = Self(0x0000_0004);
    pub const SWAP_CONFERENCE: Self = Self(0x0000_0008);
    pub const MUTE: Self = Self(0x0000_0040);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn can_merge(&self) -> bool {
        self.contains(Self::MERGE_CONFERENCE)
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Capabilities({:#010x})", self.0)
    }
}
