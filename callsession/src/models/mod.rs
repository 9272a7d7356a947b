mod audio;
mod call;
mod log;
mod types;

pub use audio::*;
pub use call::*;
pub use log::*;
pub use types::*;
