mod actions;
mod surface;

pub use actions::*;
pub use surface::*;
