mod audio;
mod call_id;
mod dtmf;
mod error;
mod recording;
mod state;
mod telephony;

pub use audio::*;
pub use call_id::*;
pub use dtmf::*;
pub use error::*;
pub use recording::*;
pub use state::*;
pub use telephony::*;
