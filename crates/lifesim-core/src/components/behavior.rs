//! Decision-related components: Personality, AgentMemory, AgentGoal, AgentDecisionState.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::common::{AgentId, ZoneId};
use super::needs::NeedType;

/// Personality traits - values from 0.0 to 1.0
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Personality {
    pub exploration_type: f32,
    pub social_preference: f32,
    pub work_ethic: f32,
    pub risk_tolerance: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            exploration_type: 0.5,
            social_preference: 0.5,
            work_ethic: 0.5,
            risk_tolerance: 0.5,
        }
    }
}

impl Personality {
    /// Generate a random personality. Traits are the mean of two draws, so
    /// moderate profiles are more common than extreme ones.
    pub fn random(rng: &mut impl rand::Rng) -> Self {
        let mut trait_value = || (rng.gen::<f32>() + rng.gen::<f32>()) / 2.0;
        Self {
            exploration_type: trait_value(),
            social_preference: trait_value(),
            work_ethic: trait_value(),
            risk_tolerance: trait_value(),
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            exploration_type: self.exploration_type.clamp(0.0, 1.0),
            social_preference: self.social_preference.clamp(0.0, 1.0),
            work_ethic: self.work_ethic.clamp(0.0, 1.0),
            risk_tolerance: self.risk_tolerance.clamp(0.0, 1.0),
        }
    }
}

/// What an agent remembers about zones it has tried
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentMemory {
    pub visited_zones: BTreeSet<ZoneId>,
    pub successes: BTreeMap<ZoneId, u32>,
    pub failures: BTreeMap<ZoneId, u32>,
}

impl AgentMemory {
    pub fn record_visit(&mut self, zone: &ZoneId) {
        self.visited_zones.insert(zone.clone());
    }

    pub fn record_success(&mut self, zone: &ZoneId) {
        *self.successes.entry(zone.clone()).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, zone: &ZoneId) {
        *self.failures.entry(zone.clone()).or_insert(0) += 1;
    }

    pub fn has_visited(&self, zone: &ZoneId) -> bool {
        self.visited_zones.contains(zone)
    }

    pub fn success_count(&self, zone: &ZoneId) -> u32 {
        self.successes.get(zone).copied().unwrap_or(0)
    }

    pub fn failure_count(&self, zone: &ZoneId) -> u32 {
        self.failures.get(zone).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    SatisfyNeed,
    Explore,
    Socialize,
    Work,
    Rest,
}

/// An intention generated by the DecisionEngine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentGoal {
    pub id: u64,
    pub goal_type: GoalType,
    /// 0.0 to 1.0
    pub priority: f32,
    pub target_zone: Option<ZoneId>,
    pub target_need: Option<NeedType>,
    /// Seconds
    pub estimated_duration: f32,
    /// Set when the goal is promoted to current
    pub started_at: Option<f64>,
    /// Injected by a priority override; survives queue regeneration until
    /// it is promoted
    #[serde(default)]
    pub forced: bool,
}

impl AgentGoal {
    pub fn new(id: u64, goal_type: GoalType, priority: f32) -> Self {
        Self {
            id,
            goal_type,
            priority: priority.clamp(0.0, 1.0),
            target_zone: None,
            target_need: None,
            estimated_duration: 0.0,
            started_at: None,
            forced: false,
        }
    }

    pub fn with_zone(mut self, zone: ZoneId) -> Self {
        self.target_zone = Some(zone);
        self
    }

    pub fn with_need(mut self, need: NeedType) -> Self {
        self.target_need = Some(need);
        self
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.estimated_duration = seconds.max(0.0);
        self
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    pub fn is_timed_out(&self, now: f64, timeout: f32) -> bool {
        self.started_at
            .map(|start| now - start > timeout as f64)
            .unwrap_or(false)
    }
}

/// Per-agent decision record owned by the DecisionEngine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDecisionState {
    pub agent_id: AgentId,
    /// At most one active goal
    pub current_goal: Option<AgentGoal>,
    pub goal_queue: VecDeque<AgentGoal>,
    pub last_decision_at: Option<f64>,
    pub player_controlled: bool,
    pub personality: Personality,
    pub memory: AgentMemory,
}

impl AgentDecisionState {
    pub fn new(agent_id: AgentId, personality: Personality) -> Self {
        Self {
            agent_id,
            current_goal: None,
            goal_queue: VecDeque::new(),
            last_decision_at: None,
            player_controlled: false,
            personality: personality.clamped(),
            memory: AgentMemory::default(),
        }
    }

    pub fn clear_goals(&mut self) {
        self.current_goal = None;
        self.goal_queue.clear();
    }
}
