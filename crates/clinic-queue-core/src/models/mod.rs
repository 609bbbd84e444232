//! Domain models for the clinic queue board.

mod lane;
mod snapshot;
mod transition;
mod visit;

pub use lane::*;
pub use snapshot::*;
pub use transition::*;
pub use visit::*;
