pub mod clock;
pub mod config;
pub mod ending;
pub mod error;
pub mod mediator;
pub mod models;
pub mod notification;
pub mod router;
pub mod session;
pub mod storage;

// Wiring of the pieces above into one process-wide owner.
mod coordinator;
// Simulated subsystem used by the demo binary and integration tests.
mod loopback;

pub use coordinator::*;
pub use error::SessionError;
pub use loopback::*;
