//! Simulation configuration with documented constants
//!
//! Every tunable number used by the three subsystems lives here. All structs
//! deserialize with `#[serde(default)]`, so a JSON document only needs to name
//! the values it overrides.
//!
//! Time values are simulation seconds; rates marked `per_minute` are divided
//! by 60 before being applied to a tick delta.

use serde::{Deserialize, Serialize};

use crate::components::{Activity, NeedType, Needs, Vec2};
use crate::error::SimResult;

/// One value per need type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerNeed {
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
    pub hygiene: f32,
    pub social: f32,
    pub fun: f32,
    pub mental_health: f32,
}

impl PerNeed {
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
}

/// Top-level configuration handed to the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the injected random source. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub vitals: VitalsConfig,
    pub locomotion: LocomotionConfig,
    pub decision: DecisionConfig,
}

impl SimConfig {
    /// Parse a (possibly partial) JSON config document
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    /// Natural decay for each need, points per minute.
    ///
    /// Thirst falls fastest and mental health slowest; at the defaults an
    /// untended agent reaches the critical band for thirst in roughly an hour
    /// of simulation time.
    pub decay_per_minute: PerNeed,

    /// Band new agents are seeded in when no initial needs are supplied
    pub initial_band: (f32, f32),

    /// Hunger or thirst at or below this starts draining energy and mental
    /// health. Kept low so cross-effects only bite at the extremes instead of
    /// compounding every tick.
    pub cross_effect_threshold: f32,
    pub starvation_energy_drain_per_minute: f32,
    pub starvation_mental_drain_per_minute: f32,
    pub dehydration_energy_drain_per_minute: f32,
    pub dehydration_mental_drain_per_minute: f32,

    /// Any need at or below this is a warning
    pub warning_threshold: f32,
    /// Any need at or below this is critical
    pub critical_threshold: f32,
    /// Two of hunger/thirst/energy/mental health at or below this is dying
    pub dying_threshold: f32,
    /// Thirst strictly below this is dying on its own
    pub dying_thirst_threshold: f32,

    /// Two of hunger/energy/mental health at or below this kills the agent
    pub death_threshold: f32,
    pub respawn_delay_secs: f32,
    /// Needs restored on respawn
    pub respawn_needs: Needs,
    /// Respawn locations; an agent always maps to the same one
    pub spawn_points: Vec<Vec2>,

    /// Base recovery while occupying a zone, points per minute, scaled by the
    /// zone type's per-need weight
    pub zone_benefit_per_minute: f32,

    /// Tick deltas above this are treated as a stall (pause, lag spike)
    pub max_tick_delta_secs: f32,
    /// After a stall, any need below this is raised to it
    pub recovery_floor: f32,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            decay_per_minute: PerNeed {
                hunger: 1.2,
                thirst: 1.6,
                energy: 0.9,
                hygiene: 0.6,
                social: 0.7,
                fun: 0.8,
                mental_health: 0.3,
            },
            initial_band: (70.0, 100.0),
            cross_effect_threshold: 10.0,
            starvation_energy_drain_per_minute: 0.5,
            starvation_mental_drain_per_minute: 0.3,
            dehydration_energy_drain_per_minute: 0.8,
            dehydration_mental_drain_per_minute: 0.5,
            warning_threshold: 25.0,
            critical_threshold: 10.0,
            dying_threshold: 5.0,
            dying_thirst_threshold: 2.0,
            death_threshold: 10.0,
            respawn_delay_secs: 10.0,
            respawn_needs: Needs {
                hunger: 85.0,
                thirst: 85.0,
                energy: 90.0,
                hygiene: 80.0,
                social: 80.0,
                fun: 80.0,
                mental_health: 80.0,
            },
            spawn_points: vec![Vec2::new(160.0, 160.0), Vec2::new(480.0, 160.0)],
            zone_benefit_per_minute: 6.0,
            max_tick_delta_secs: 5.0,
            recovery_floor: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Side length of an obstacle-grid tile (world units)
    pub tile_size: f32,

    /// Below this straight-line distance a direct two-point path is used
    pub short_path_threshold: f32,
    /// Wall-clock budget for a single grid search
    pub search_time_budget_ms: u64,
    /// Hard cap on expanded nodes per search, independent of wall-clock time
    pub max_search_nodes: usize,
    /// Ring radius (tiles) searched for a free tile around a blocked target
    pub fallback_search_radius: i32,

    /// Path results older than this are recomputed
    pub path_cache_ttl_secs: f32,
    pub path_cache_capacity: usize,

    /// Travel speed at zero fatigue (world units per second)
    pub base_speed: f32,
    /// Speed divisor is `1 + fatigue / 100 * fatigue_speed_penalty`
    pub fatigue_speed_penalty: f32,
    pub fatigue_gain_per_sec: f32,
    pub fatigue_rest_recovery_per_sec: f32,
    pub fatigue_idle_decay_per_sec: f32,

    /// Zone pairs closer than this are `easy`
    pub easy_max_distance: f32,
    /// Zone pairs closer than this (and not easy) are `medium`
    pub medium_max_distance: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            short_path_threshold: 96.0,
            search_time_budget_ms: 8,
            max_search_nodes: 6000,
            fallback_search_radius: 3,
            path_cache_ttl_secs: 30.0,
            path_cache_capacity: 512,
            base_speed: 60.0,
            fatigue_speed_penalty: 0.5,
            fatigue_gain_per_sec: 0.4,
            fatigue_rest_recovery_per_sec: 1.5,
            fatigue_idle_decay_per_sec: 0.1,
            easy_max_distance: 200.0,
            medium_max_distance: 500.0,
        }
    }
}

/// How long an agent stays busy at a zone after completing a goal there
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalActivitySecs {
    pub eating: f32,
    pub resting: f32,
    pub working: f32,
    pub socializing: f32,
}

impl Default for ArrivalActivitySecs {
    fn default() -> Self {
        Self {
            eating: 8.0,
            resting: 15.0,
            working: 20.0,
            socializing: 12.0,
        }
    }
}

impl ArrivalActivitySecs {
    pub fn get(&self, activity: Activity) -> f32 {
        match activity {
            Activity::Eating => self.eating,
            Activity::Resting => self.resting,
            Activity::Working => self.working,
            Activity::Socializing => self.socializing,
            Activity::Idle | Activity::Moving => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Seconds between goal-generation passes for one agent
    pub decision_interval_secs: f32,

    /// A need below its threshold produces a satisfy-need goal
    pub critical_thresholds: PerNeed,
    /// Scales need urgency; thirst outranks hunger at equal deficit
    pub urgency_multipliers: PerNeed,

    /// Goals below this priority are discarded
    pub min_priority: f32,
    pub max_queue: usize,
    /// A current goal older than this counts as failed
    pub goal_timeout_secs: f32,

    /// Zone score bonus per remembered success, capped at `max_success_bonus`
    pub success_bonus: f32,
    pub max_success_bonus: f32,
    /// Zone score penalty per remembered failure
    pub failure_penalty: f32,
    /// The failure penalty is scaled by
    /// `1 + risk_penalty_relief * (0.5 - risk_tolerance)`
    pub risk_penalty_relief: f32,
    /// Distance divisor in zone scoring
    pub distance_scale: f32,

    /// Explore priority is `explore_base + explore_weight * exploration_type`
    pub explore_base: f32,
    pub explore_weight: f32,
    /// Energy needed before exploring is considered
    pub explore_min_energy: f32,

    pub work_base: f32,
    pub work_weight: f32,
    pub work_min_energy: f32,

    pub socialize_base: f32,
    pub socialize_weight: f32,
    /// Socializing is only considered while social is below this
    pub socialize_max_social: f32,

    /// Rest is considered while energy is below this
    pub rest_energy_threshold: f32,
    pub rest_base: f32,

    /// Expected time spent on a goal once at the zone
    pub goal_duration_secs: f32,

    pub arrival_activity_secs: ArrivalActivitySecs,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            decision_interval_secs: 3.0,
            critical_thresholds: PerNeed {
                hunger: 40.0,
                thirst: 40.0,
                energy: 30.0,
                hygiene: 30.0,
                social: 30.0,
                fun: 25.0,
                mental_health: 35.0,
            },
            urgency_multipliers: PerNeed {
                hunger: 1.2,
                thirst: 1.4,
                energy: 1.1,
                hygiene: 0.8,
                social: 0.7,
                fun: 0.6,
                mental_health: 1.0,
            },
            min_priority: 0.2,
            max_queue: 3,
            goal_timeout_secs: 90.0,
            success_bonus: 0.1,
            max_success_bonus: 0.5,
            failure_penalty: 0.2,
            risk_penalty_relief: 1.0,
            distance_scale: 1000.0,
            explore_base: 0.2,
            explore_weight: 0.4,
            explore_min_energy: 40.0,
            work_base: 0.2,
            work_weight: 0.4,
            work_min_energy: 35.0,
            socialize_base: 0.15,
            socialize_weight: 0.45,
            socialize_max_social: 80.0,
            rest_energy_threshold: 60.0,
            rest_base: 0.25,
            goal_duration_secs: 10.0,
            arrival_activity_secs: ArrivalActivitySecs::default(),
        }
    }
}
