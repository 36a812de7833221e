//! Systems - logic that operates on components

mod decision;
mod locomotion;
mod vitals;

pub use decision::*;
pub use locomotion::*;
pub use vitals::*;
