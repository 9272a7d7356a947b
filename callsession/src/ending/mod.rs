mod collaborators;
mod handler;
mod summary;

pub use collaborators::*;
pub use handler::*;
pub use summary::*;
