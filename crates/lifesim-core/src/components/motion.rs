//! Locomotion components: Activity and LocomotionState.

use serde::{Deserialize, Serialize};

use super::common::{AgentId, Vec2, ZoneId};

/// What an agent is doing. Exactly one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    #[default]
    Idle,
    Moving,
    Working,
    Resting,
    Eating,
    Socializing,
}

impl Activity {
    /// Activities that must finish before the agent may travel
    pub fn is_blocking(&self) -> bool {
        matches!(self, Activity::Working | Activity::Resting | Activity::Eating)
    }

    /// Activities that can be started with a timer
    pub fn is_timed(&self) -> bool {
        !matches!(self, Activity::Idle | Activity::Moving)
    }
}

/// Per-agent movement record owned by Locomotion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocomotionState {
    pub agent_id: AgentId,
    pub position: Vec2,
    pub target_position: Option<Vec2>,
    pub target_zone: Option<ZoneId>,
    /// Zone the agent last arrived at; cleared on departure
    pub current_zone: Option<ZoneId>,
    /// Ordered waypoints from the start position to the target
    pub path: Vec<Vec2>,
    pub activity: Activity,
    pub activity_started_at: f64,
    /// Seconds; for `Moving` this is the estimated travel time
    pub activity_duration: f32,
    /// 0.0 to 100.0
    pub fatigue: f32,
}

impl LocomotionState {
    pub fn new(agent_id: AgentId, position: Vec2) -> Self {
        Self {
            agent_id,
            position,
            target_position: None,
            target_zone: None,
            current_zone: None,
            path: Vec::new(),
            activity: Activity::Idle,
            activity_started_at: 0.0,
            activity_duration: 0.0,
            fatigue: 0.0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.activity == Activity::Moving
    }

    pub fn is_idle(&self) -> bool {
        self.activity == Activity::Idle
    }

    /// Drop any travel or activity and stand still at the current position
    pub fn halt(&mut self) {
        self.activity = Activity::Idle;
        self.target_position = None;
        self.target_zone = None;
        self.path.clear();
        self.activity_duration = 0.0;
    }

    /// Seconds elapsed in the current activity, as a fraction of its duration
    pub fn progress(&self, now: f64) -> f32 {
        if self.activity_duration <= 0.0 {
            return 1.0;
        }
        (((now - self.activity_started_at) / self.activity_duration as f64) as f32).clamp(0.0, 1.0)
    }
}
