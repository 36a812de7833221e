//! Need-related components: NeedType, Needs, EmergencyLevel, AgentVitals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::common::{AgentId, ZoneId};
use crate::error::SimError;

/// Lowest value any need can hold
pub const NEED_MIN: f32 = 0.0;
/// Highest value any need can hold
pub const NEED_MAX: f32 = 100.0;

/// Types of needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedType {
    Hunger,
    Thirst,
    Energy,
    Hygiene,
    Social,
    Fun,
    MentalHealth,
}

impl NeedType {
    pub const ALL: [NeedType; 7] = [
        NeedType::Hunger,
        NeedType::Thirst,
        NeedType::Energy,
        NeedType::Hygiene,
        NeedType::Social,
        NeedType::Fun,
        NeedType::MentalHealth,
    ];

    /// Canonical key used by collaborators
    pub fn key(&self) -> &'static str {
        match self {
            NeedType::Hunger => "hunger",
            NeedType::Thirst => "thirst",
            NeedType::Energy => "energy",
            NeedType::Hygiene => "hygiene",
            NeedType::Social => "social",
            NeedType::Fun => "fun",
            NeedType::MentalHealth => "mentalHealth",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            NeedType::Hunger => 0,
            NeedType::Thirst => 1,
            NeedType::Energy => 2,
            NeedType::Hygiene => 3,
            NeedType::Social => 4,
            NeedType::Fun => 5,
            NeedType::MentalHealth => 6,
        }
    }
}

impl FromStr for NeedType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hunger" => Ok(NeedType::Hunger),
            "thirst" => Ok(NeedType::Thirst),
            "energy" => Ok(NeedType::Energy),
            "hygiene" => Ok(NeedType::Hygiene),
            "social" => Ok(NeedType::Social),
            "fun" => Ok(NeedType::Fun),
            "mentalHealth" | "mental_health" => Ok(NeedType::MentalHealth),
            other => Err(SimError::InvalidNeedKey(other.to_string())),
        }
    }
}

/// Need values - 0.0 (desperate) to 100.0 (fully satisfied)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Needs {
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
    pub hygiene: f32,
    pub social: f32,
    pub fun: f32,
    pub mental_health: f32,
}

impl Default for Needs {
    fn default() -> Self {
        Self::uniform(NEED_MAX)
    }
}

impl Needs {
    pub fn uniform(value: f32) -> Self {
        let v = value.clamp(NEED_MIN, NEED_MAX);
        Self {
            hunger: v,
            thirst: v,
            energy: v,
            hygiene: v,
            social: v,
            fun: v,
            mental_health: v,
        }
    }

    /// Random needs inside the given band (used when no initial needs are supplied)
    pub fn random_in_band(rng: &mut impl rand::Rng, low: f32, high: f32) -> Self {
        let (low, high) = (low.clamp(NEED_MIN, NEED_MAX), high.clamp(NEED_MIN, NEED_MAX));
        let mut needs = Self::uniform(low);
        if high > low {
            for need in NeedType::ALL {
                needs.set(need, rng.gen_range(low..=high));
            }
        }
        needs
    }

    pub fn get(&self, need: NeedType) -> f32 {
        match need {
            NeedType::Hunger => self.hunger,
            NeedType::Thirst => self.thirst,
            NeedType::Energy => self.energy,
            NeedType::Hygiene => self.hygiene,
            NeedType::Social => self.social,
            NeedType::Fun => self.fun,
            NeedType::MentalHealth => self.mental_health,
        }
    }

    /// Set a need, clamped to [0, 100]. Non-finite values are ignored.
    pub fn set(&mut self, need: NeedType, value: f32) {
        if !value.is_finite() {
            return;
        }
        let slot = match need {
            NeedType::Hunger => &mut self.hunger,
            NeedType::Thirst => &mut self.thirst,
            NeedType::Energy => &mut self.energy,
            NeedType::Hygiene => &mut self.hygiene,
            NeedType::Social => &mut self.social,
            NeedType::Fun => &mut self.fun,
            NeedType::MentalHealth => &mut self.mental_health,
        };
        *slot = value.clamp(NEED_MIN, NEED_MAX);
    }

    /// Add `delta` to a need (negative drains), returning the applied change
    pub fn adjust(&mut self, need: NeedType, delta: f32) -> f32 {
        let before = self.get(need);
        self.set(need, before + delta);
        self.get(need) - before
    }

    pub fn clamp_all(&mut self) {
        for need in NeedType::ALL {
            let value = self.get(need);
            let value = if value.is_finite() { value } else { NEED_MIN };
            self.set(need, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeedType, f32)> + '_ {
        NeedType::ALL.into_iter().map(move |need| (need, self.get(need)))
    }

    /// Lowest need; ties resolve to the first in `NeedType::ALL` order
    pub fn lowest(&self) -> (NeedType, f32) {
        let mut lowest = (NeedType::Hunger, self.hunger);
        for (need, value) in self.iter() {
            if value < lowest.1 {
                lowest = (need, value);
            }
        }
        lowest
    }

    pub fn count_at_or_below(&self, needs: &[NeedType], threshold: f32) -> usize {
        needs.iter().filter(|n| self.get(**n) <= threshold).count()
    }
}

/// Overall severity of an agent's need state
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyLevel {
    #[default]
    None,
    Warning,
    Critical,
    Dying,
}

/// Per-agent vitals record owned by the VitalsModel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentVitals {
    pub agent_id: AgentId,
    pub needs: Needs,
    pub emergency: EmergencyLevel,
    pub current_zone: Option<ZoneId>,
    /// Cumulative amount satisfied per zone
    pub satisfaction_sources: BTreeMap<ZoneId, f32>,
    pub is_dead: bool,
    pub death_time: Option<f64>,
    pub respawn_at: Option<f64>,
}

impl AgentVitals {
    pub fn new(agent_id: AgentId, needs: Needs) -> Self {
        let mut needs = needs;
        needs.clamp_all();
        Self {
            agent_id,
            needs,
            emergency: EmergencyLevel::None,
            current_zone: None,
            satisfaction_sources: BTreeMap::new(),
            is_dead: false,
            death_time: None,
            respawn_at: None,
        }
    }

    /// Record a satisfied amount against the current zone, if any
    pub fn record_source(&mut self, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        if let Some(zone) = &self.current_zone {
            *self.satisfaction_sources.entry(zone.clone()).or_insert(0.0) += amount;
        }
    }
}
