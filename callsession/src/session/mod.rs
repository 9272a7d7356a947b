mod ingester;
mod listener;
mod state;

pub use ingester::*;
pub use listener::*;
pub use state::*;
