//! Component definitions for the simulation.
//!
//! Components are pure data structs owned by one subsystem each.
//! They have no behavior beyond small helpers - that lives in systems.

mod behavior;
mod common;
mod motion;
mod needs;
mod world;

pub use behavior::*;
pub use common::*;
pub use motion::*;
pub use needs::*;
pub use world::*;
