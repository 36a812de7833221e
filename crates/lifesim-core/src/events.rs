//! Typed simulation events.
//!
//! Each subsystem pushes into its own `EventQueue`; the engine drains the
//! queues after every phase, routes events to the other subsystems and hands
//! them to any registered `SimObserver`.

use serde::{Deserialize, Serialize};

use crate::components::{Activity, AgentId, EmergencyLevel, NeedType, Vec2, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    NeedsSatisfied {
        agent: AgentId,
        need: NeedType,
        amount: f32,
        zone: Option<ZoneId>,
    },
    EntityDeath {
        agent: AgentId,
        at: f64,
    },
    EntityRespawn {
        agent: AgentId,
        position: Vec2,
        at: f64,
    },
    ArrivedAtZone {
        agent: AgentId,
        zone: ZoneId,
    },
    ActivityCompleted {
        agent: AgentId,
        activity: Activity,
    },
    EmergencyLevelChanged {
        agent: AgentId,
        from: EmergencyLevel,
        to: EmergencyLevel,
    },
    MovementStarted {
        agent: AgentId,
        zone: ZoneId,
        /// False when the grid search failed and a direct path is used
        path_found: bool,
    },
}

impl SimEvent {
    pub fn agent(&self) -> &AgentId {
        match self {
            SimEvent::NeedsSatisfied { agent, .. }
            | SimEvent::EntityDeath { agent, .. }
            | SimEvent::EntityRespawn { agent, .. }
            | SimEvent::ArrivedAtZone { agent, .. }
            | SimEvent::ActivityCompleted { agent, .. }
            | SimEvent::EmergencyLevelChanged { agent, .. }
            | SimEvent::MovementStarted { agent, .. } => agent,
        }
    }
}

/// Outbox of events produced by one subsystem
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<SimEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn peek(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Collaborator hook for rendering, dialogue, persistence and the like
pub trait SimObserver {
    fn on_event(&mut self, event: &SimEvent);
}

impl<F: FnMut(&SimEvent)> SimObserver for F {
    fn on_event(&mut self, event: &SimEvent) {
        self(event)
    }
}
