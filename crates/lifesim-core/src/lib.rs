//! LifeSim Core - Autonomous Agent Simulation Engine
//!
//! Agents with decaying needs form goals from those needs and their
//! personality, then walk across a tiled world to satisfy them.
//!
//! # Architecture
//!
//! Three subsystems, each owning its own per-agent records in an
//! [`arena::AgentArena`] (a `hecs` world plus an id lookup):
//! - **VitalsModel**: need decay, emergency levels, zone benefits, death/respawn
//! - **Locomotion**: positions, paths, activities, fatigue, route caches
//! - **DecisionEngine**: goal generation, zone scoring, goal queue, memory
//!
//! [`engine::SimulationEngine`] ticks them in that order with the same delta
//! and routes the typed [`events::SimEvent`]s between them.
//!
//! # Example
//!
//! ```rust,no_run
//! use lifesim_core::prelude::*;
//!
//! let mut engine = SimulationEngine::new(SimConfig::default().with_seed(7));
//! engine.set_world(
//!     WorldSnapshot::new(Bounds::new(0.0, 0.0, 640.0, 480.0))
//!         .with_zone(Zone::new("cafe", ZoneType::Food, Bounds::new(400.0, 0.0, 96.0, 96.0))),
//! );
//! engine.spawn_agent(AgentSpawn::new("isa", Vec2::new(48.0, 48.0))).unwrap();
//!
//! loop {
//!     engine.update(1.0 / 10.0);
//!     for event in engine.drain_events() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod arena;
pub mod cache;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod pathfinding;
pub mod persistence;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::SimConfig;
    pub use crate::engine::{AgentSpawn, SimulationEngine};
    pub use crate::error::{SimError, SimResult};
    pub use crate::events::{SimEvent, SimObserver};
    pub use crate::systems::PriorityOverride;
}
