//! Domain models for the dental visit tracking system.

mod hygienist;
mod patient;
mod period;
mod visit;

pub use hygienist::*;
pub use patient::*;
pub use period::*;
pub use visit::*;
