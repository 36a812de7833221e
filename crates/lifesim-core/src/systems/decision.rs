//! Decision system - goal generation, zone scoring, queueing and memory.
//!
//! Runs once per decision interval per autonomous agent. Reads vitals through
//! `NeedsSource` and issues travel through `TravelPlanner`, so it never holds
//! references into the other subsystems.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

use super::locomotion::TravelPlanner;
use super::vitals::{NeedsSource, VitalsSnapshot};
use crate::arena::AgentArena;
use crate::components::{
    AgentDecisionState, AgentGoal, AgentId, GoalType, NeedType, Personality, Zone, ZoneId, ZoneType,
};
use crate::config::DecisionConfig;
use crate::error::SimError;

/// Externally forced priority modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityOverride {
    /// Drop everything and go after the most critical need
    Survival,
}

/// Exploration weight multiplier for zones the agent has never visited
const UNVISITED_EXPLORE_WEIGHT: f32 = 3.0;

pub struct DecisionEngine {
    config: DecisionConfig,
    agents: AgentArena<AgentDecisionState>,
    zones: Vec<Zone>,
    clock: f64,
    next_goal_id: u64,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            agents: AgentArena::new(),
            zones: Vec::new(),
            clock: 0.0,
            next_goal_id: 1,
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn add_agent(&mut self, agent: AgentId, personality: Personality) {
        let state = AgentDecisionState::new(agent.clone(), personality);
        self.agents.insert(agent, state);
    }

    pub fn restore(&mut self, state: AgentDecisionState) {
        let max_goal_id = state
            .current_goal
            .iter()
            .chain(state.goal_queue.iter())
            .map(|g| g.id)
            .max()
            .unwrap_or(0);
        self.next_goal_id = self.next_goal_id.max(max_goal_id + 1);
        self.agents.insert(state.agent_id.clone(), state);
    }

    pub fn remove(&mut self, agent: &AgentId) -> Option<AgentDecisionState> {
        self.agents.remove(agent)
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        self.agents.contains(agent)
    }

    pub fn state(&self, agent: &AgentId) -> Option<AgentDecisionState> {
        self.agents.get_cloned(agent)
    }

    pub fn current_goal(&self, agent: &AgentId) -> Option<AgentGoal> {
        self.agents.get(agent).and_then(|s| s.current_goal.clone())
    }

    pub fn set_zones(&mut self, zones: &[Zone]) {
        self.zones = zones.to_vec();
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn restore_clock(&mut self, now: f64) {
        self.clock = now;
    }

    /// Advance goal management for every autonomous agent
    pub fn tick<N, T, R>(&mut self, delta_seconds: f32, needs: &N, travel: &mut T, rng: &mut R)
    where
        N: NeedsSource + ?Sized,
        T: TravelPlanner + ?Sized,
        R: Rng + ?Sized,
    {
        if delta_seconds.is_finite() && delta_seconds > 0.0 {
            self.clock += delta_seconds as f64;
        }
        let now = self.clock;

        for agent in self.agents.ids() {
            // No vitals yet: stay idle
            let Some(snapshot) = needs.needs_snapshot(&agent) else {
                continue;
            };
            if snapshot.is_dead {
                continue;
            }
            let Some(state) = self.agents.get_mut(&agent) else {
                continue;
            };
            if state.player_controlled {
                continue;
            }

            if let Some(goal) = state.current_goal.as_ref() {
                if goal.is_timed_out(now, self.config.goal_timeout_secs) {
                    log::debug!("Agent {} goal {} timed out", agent, goal.id);
                    if let Some(zone) = goal.target_zone.as_ref() {
                        state.memory.record_failure(zone);
                    }
                    state.current_goal = None;
                }
            }

            let due = state
                .last_decision_at
                .map(|at| now - at >= self.config.decision_interval_secs as f64)
                .unwrap_or(true);
            if due {
                // A pending override outranks anything regenerated
                let mut queue: VecDeque<AgentGoal> =
                    state.goal_queue.iter().filter(|g| g.forced).cloned().collect();
                queue.extend(generate_goals(
                    &self.config,
                    &self.zones,
                    state,
                    &snapshot,
                    &*travel,
                    rng,
                    &mut self.next_goal_id,
                ));
                queue.truncate(self.config.max_queue);
                state.goal_queue = queue;
                state.last_decision_at = Some(now);
            }

            if state.current_goal.is_none() {
                promote_next_goal(state, now, travel);
            }
        }
    }

    /// Complete the current goal if `zone` is its target. Returns the goal.
    pub fn notify_arrival(&mut self, agent: &AgentId, zone: &ZoneId) -> Option<AgentGoal> {
        let state = self.agents.get_mut(agent)?;
        let matches = state
            .current_goal
            .as_ref()
            .map(|g| g.target_zone.as_ref() == Some(zone))
            .unwrap_or(false);
        if !matches {
            return None;
        }
        state.memory.record_success(zone);
        state.current_goal.take()
    }

    /// Drop the agent's current goal and queue (death, teleport)
    pub fn clear_goals(&mut self, agent: &AgentId) {
        if let Some(state) = self.agents.get_mut(agent) {
            state.clear_goals();
        }
    }

    pub fn set_player_control(&mut self, agent: &AgentId, enabled: bool) -> bool {
        let Some(state) = self.agents.get_mut(agent) else {
            log::warn!("set_player_control: unknown agent {}", agent);
            return false;
        };
        state.player_controlled = enabled;
        if enabled {
            state.clear_goals();
        }
        true
    }

    pub fn is_player_controlled(&self, agent: &AgentId) -> bool {
        self.agents
            .get(agent)
            .map(|s| s.player_controlled)
            .unwrap_or(false)
    }

    /// Replace the agent's plans with a single top-priority goal. Returns
    /// false if the agent is unknown or no zone can serve the target need.
    ///
    /// The goal is kept at the head of the queue until it is promoted, so a
    /// busy agent picks it up as soon as it is free.
    pub fn set_priority_override<N>(
        &mut self,
        agent: &AgentId,
        mode: PriorityOverride,
        needs: &N,
    ) -> bool
    where
        N: NeedsSource + ?Sized,
    {
        let Some(state) = self.agents.get_mut(agent) else {
            log::warn!("set_priority_override: unknown agent {}", agent);
            return false;
        };
        state.clear_goals();
        state.last_decision_at = Some(self.clock);

        match mode {
            PriorityOverride::Survival => {
                let Some(snapshot) = needs.needs_snapshot(agent) else {
                    return false;
                };
                let (need, _) = snapshot.needs.lowest();
                let Some(zone) = best_ranked_zone(&self.zones, need) else {
                    log::debug!(
                        "No zone serves {:?} for {}'s survival override",
                        need,
                        agent
                    );
                    return false;
                };
                let goal = AgentGoal::new(self.next_goal_id, GoalType::SatisfyNeed, 1.0)
                    .with_need(need)
                    .with_zone(zone)
                    .with_duration(self.config.goal_duration_secs)
                    .forced();
                self.next_goal_id += 1;
                state.goal_queue.push_front(goal);
                true
            }
        }
    }
}

/// Dequeue the next goal and ask locomotion to take the agent there
fn promote_next_goal<T>(state: &mut AgentDecisionState, now: f64, travel: &mut T)
where
    T: TravelPlanner + ?Sized,
{
    while let Some(mut goal) = state.goal_queue.pop_front() {
        let Some(zone) = goal.target_zone.clone() else {
            continue;
        };
        match travel.request_travel(&state.agent_id, &zone) {
            Ok(_) => {
                goal.started_at = Some(now);
                state.memory.record_visit(&zone);
                state.current_goal = Some(goal);
                return;
            }
            Err(SimError::AgentBusy { .. }) => {
                state.goal_queue.push_front(goal);
                return;
            }
            Err(err) => {
                log::warn!(
                    "Agent {} could not start goal {}: {}",
                    state.agent_id,
                    goal.id,
                    err
                );
                state.memory.record_failure(&zone);
            }
        }
    }
}

/// Most attractive zone serving `need`, ignoring memory and distance
fn best_ranked_zone(zones: &[Zone], need: NeedType) -> Option<ZoneId> {
    let mut best: Option<&Zone> = None;
    for zone in zones.iter().filter(|z| z.zone_type.serves(need)) {
        if best.map(|b| zone.attractiveness > b.attractiveness).unwrap_or(true) {
            best = Some(zone);
        }
    }
    best.map(|z| z.id.clone())
}

/// `attractiveness + success bonus - failure penalty - distance / scale`
///
/// Risk-tolerant agents hold past failures against a zone less.
pub fn score_zone(
    config: &DecisionConfig,
    state: &AgentDecisionState,
    zone: &Zone,
    distance: f32,
) -> f32 {
    let successes = state.memory.success_count(&zone.id) as f32;
    let failures = state.memory.failure_count(&zone.id) as f32;
    let caution =
        (1.0 + config.risk_penalty_relief * (0.5 - state.personality.risk_tolerance)).max(0.0);
    zone.attractiveness + (successes * config.success_bonus).min(config.max_success_bonus)
        - failures * config.failure_penalty * caution
        - distance / config.distance_scale
}

/// Highest-scoring zone accepted by `filter`; ties keep the first seen
fn best_zone<T, F>(
    config: &DecisionConfig,
    zones: &[Zone],
    state: &AgentDecisionState,
    travel: &T,
    filter: F,
) -> Option<ZoneId>
where
    T: TravelPlanner + ?Sized,
    F: Fn(&Zone) -> bool,
{
    let mut best: Option<(f32, &Zone)> = None;
    for zone in zones.iter().filter(|z| filter(z)) {
        let distance = travel
            .distance_to_zone(&state.agent_id, &zone.id)
            .unwrap_or(0.0);
        let score = score_zone(config, state, zone, distance);
        if best.map(|(s, _)| score > s).unwrap_or(true) {
            best = Some((score, zone));
        }
    }
    best.map(|(_, z)| z.id.clone())
}

/// Weighted-random exploration target, favoring unvisited zones and
/// skipping the zone the agent is standing in
fn pick_exploration_zone<T, R>(
    zones: &[Zone],
    state: &AgentDecisionState,
    travel: &T,
    rng: &mut R,
) -> Option<ZoneId>
where
    T: TravelPlanner + ?Sized,
    R: Rng + ?Sized,
{
    let candidates: Vec<&Zone> = zones
        .iter()
        .filter(|z| travel.distance_to_zone(&state.agent_id, &z.id) != Some(0.0))
        .collect();
    candidates
        .choose_weighted(rng, |z| {
            let base = z.attractiveness.max(0.05);
            if state.memory.has_visited(&z.id) {
                base
            } else {
                base * UNVISITED_EXPLORE_WEIGHT
            }
        })
        .ok()
        .map(|z| z.id.clone())
}

/// Build the next goal queue: critical-need goals plus personality-driven
/// opportunities, filtered, sorted by priority and truncated.
fn generate_goals<T, R>(
    config: &DecisionConfig,
    zones: &[Zone],
    state: &AgentDecisionState,
    snapshot: &VitalsSnapshot,
    travel: &T,
    rng: &mut R,
    next_id: &mut u64,
) -> Vec<AgentGoal>
where
    T: TravelPlanner + ?Sized,
    R: Rng + ?Sized,
{
    let mut goals = Vec::new();
    let mut push = |goals: &mut Vec<AgentGoal>,
                    goal_type: GoalType,
                    priority: f32,
                    zone: ZoneId,
                    need: Option<NeedType>| {
        let mut goal = AgentGoal::new(*next_id, goal_type, priority)
            .with_zone(zone)
            .with_duration(config.goal_duration_secs);
        if let Some(need) = need {
            goal = goal.with_need(need);
        }
        *next_id += 1;
        goals.push(goal);
    };

    let needs = &snapshot.needs;
    for need in NeedType::ALL {
        let value = needs.get(need);
        if value >= config.critical_thresholds.get(need) {
            continue;
        }
        let urgency = (100.0 - value) / 100.0 * config.urgency_multipliers.get(need);
        let priority = urgency.clamp(0.0, 1.0);
        if let Some(zone) = best_zone(config, zones, state, travel, |z| z.zone_type.serves(need))
        {
            push(&mut goals, GoalType::SatisfyNeed, priority, zone, Some(need));
        }
    }

    let personality = &state.personality;
    if needs.energy > config.explore_min_energy {
        if let Some(zone) = pick_exploration_zone(zones, state, travel, rng) {
            let priority =
                config.explore_base + config.explore_weight * personality.exploration_type;
            push(&mut goals, GoalType::Explore, priority, zone, None);
        }
    }
    if needs.energy > config.work_min_energy {
        let is_work = |z: &Zone| z.zone_type == ZoneType::Work;
        if let Some(zone) = best_zone(config, zones, state, travel, is_work) {
            let priority = config.work_base + config.work_weight * personality.work_ethic;
            push(&mut goals, GoalType::Work, priority, zone, None);
        }
    }
    if needs.social < config.socialize_max_social {
        let is_social = |z: &Zone| z.zone_type.serves(NeedType::Social);
        if let Some(zone) = best_zone(config, zones, state, travel, is_social) {
            let priority =
                config.socialize_base + config.socialize_weight * personality.social_preference;
            push(&mut goals, GoalType::Socialize, priority, zone, Some(NeedType::Social));
        }
    }
    if needs.energy < config.rest_energy_threshold {
        let is_restful = |z: &Zone| z.zone_type.serves(NeedType::Energy);
        if let Some(zone) = best_zone(config, zones, state, travel, is_restful) {
            let priority = config.rest_base + (config.rest_energy_threshold - needs.energy) / 100.0;
            push(&mut goals, GoalType::Rest, priority, zone, Some(NeedType::Energy));
        }
    }

    goals.retain(|g| g.priority >= config.min_priority);
    goals.sort_by(|a, b| {
        b.priority
            .partial_cmp(&a.priority)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    goals.truncate(config.max_queue);
    goals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Bounds, EmergencyLevel, Needs};
    use crate::error::SimResult;
    use crate::systems::locomotion::TravelPlan;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeVitals {
        needs: HashMap<AgentId, (Needs, bool)>,
    }

    impl FakeVitals {
        fn with(agent: &AgentId, needs: Needs) -> Self {
            let mut fake = Self::default();
            fake.needs.insert(agent.clone(), (needs, false));
            fake
        }
    }

    impl NeedsSource for FakeVitals {
        fn needs_snapshot(&self, agent: &AgentId) -> Option<VitalsSnapshot> {
            self.needs.get(agent).map(|(needs, dead)| VitalsSnapshot {
                needs: *needs,
                emergency: EmergencyLevel::None,
                is_dead: *dead,
            })
        }
    }

    #[derive(Default)]
    struct FakeTravel {
        requests: Vec<(AgentId, ZoneId)>,
        busy: bool,
        distances: HashMap<ZoneId, f32>,
        known: Vec<ZoneId>,
    }

    impl TravelPlanner for FakeTravel {
        fn request_travel(&mut self, agent: &AgentId, zone: &ZoneId) -> SimResult<TravelPlan> {
            if self.busy {
                return Err(SimError::AgentBusy {
                    agent: agent.clone(),
                    activity: crate::components::Activity::Eating,
                });
            }
            if !self.known.is_empty() && !self.known.contains(zone) {
                return Err(SimError::UnknownZone(zone.clone()));
            }
            self.requests.push((agent.clone(), zone.clone()));
            Ok(TravelPlan {
                agent: agent.clone(),
                zone: zone.clone(),
                path: Vec::new(),
                path_found: true,
                distance: 0.0,
                estimated_time: 1.0,
            })
        }

        fn distance_to_zone(&self, _agent: &AgentId, zone: &ZoneId) -> Option<f32> {
            Some(self.distances.get(zone).copied().unwrap_or(100.0))
        }
    }

    fn zone(id: &str, zone_type: ZoneType, attractiveness: f32) -> Zone {
        Zone::new(id, zone_type, Bounds::new(0.0, 0.0, 32.0, 32.0))
            .with_attractiveness(attractiveness)
    }

    fn engine(zones: &[Zone]) -> (DecisionEngine, AgentId) {
        let mut engine = DecisionEngine::new(DecisionConfig::default());
        engine.set_zones(zones);
        let id = AgentId::from("isa");
        engine.add_agent(id.clone(), Personality::default());
        (engine, id)
    }

    /// Needs that produce no critical goals and no rest goal
    fn content() -> Needs {
        Needs::uniform(90.0)
    }

    fn generate(
        engine: &mut DecisionEngine,
        agent: &AgentId,
        needs: Needs,
        travel: &FakeTravel,
    ) -> Vec<AgentGoal> {
        let snapshot = FakeVitals::with(agent, needs).needs_snapshot(agent).unwrap();
        let state = engine.state(agent).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        generate_goals(
            &engine.config,
            &engine.zones,
            &state,
            &snapshot,
            travel,
            &mut rng,
            &mut engine.next_goal_id,
        )
    }

    #[test]
    fn test_critical_need_goal_targets_serving_zone() {
        let (mut engine, id) = engine(&[
            zone("park", ZoneType::Park, 0.9),
            zone("cafe", ZoneType::Food, 0.6),
        ]);
        let mut needs = content();
        needs.hunger = 20.0;
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        let hunger = goals
            .iter()
            .find(|g| g.target_need == Some(NeedType::Hunger))
            .unwrap();
        assert_eq!(hunger.goal_type, GoalType::SatisfyNeed);
        assert_eq!(hunger.target_zone, Some(ZoneId::from("cafe")));
        assert!((hunger.priority - 0.96).abs() < 1e-4);
    }

    #[test]
    fn test_thirst_outranks_hunger_at_equal_deficit() {
        let (mut engine, id) = engine(&[
            zone("cafe", ZoneType::Food, 0.5),
            zone("well", ZoneType::Water, 0.5),
        ]);
        let mut needs = content();
        needs.hunger = 30.0;
        needs.thirst = 30.0;
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        assert_eq!(goals[0].target_need, Some(NeedType::Thirst));
        assert_eq!(goals[1].target_need, Some(NeedType::Hunger));
    }

    #[test]
    fn test_no_serving_zone_means_no_goal() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut needs = content();
        needs.thirst = 10.0;
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        assert!(goals.iter().all(|g| g.target_need != Some(NeedType::Thirst)));
    }

    #[test]
    fn test_zone_scoring_uses_memory_and_distance() {
        let zones = [zone("diner", ZoneType::Food, 0.6), zone("cafe", ZoneType::Food, 0.6)];
        let (mut engine, id) = engine(&zones);
        let mut needs = content();
        needs.hunger = 20.0;

        // Tie: first seen wins
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        assert_eq!(goals[0].target_zone, Some(ZoneId::from("diner")));

        // Remembered failure sinks the diner
        let mut state = engine.state(&id).unwrap();
        state.memory.record_failure(&ZoneId::from("diner"));
        engine.restore(state);
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        assert_eq!(goals[0].target_zone, Some(ZoneId::from("cafe")));

        // Distance penalty is distance / 1000
        let state = engine.state(&id).unwrap();
        let config = DecisionConfig::default();
        let near = score_zone(&config, &state, &zones[1], 0.0);
        let far = score_zone(&config, &state, &zones[1], 500.0);
        assert!((near - far - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_success_bonus_is_capped() {
        let (engine, id) = engine(&[]);
        let mut state = engine.state(&id).unwrap();
        let cafe = zone("cafe", ZoneType::Food, 0.5);
        for _ in 0..20 {
            state.memory.record_success(&cafe.id);
        }
        let score = score_zone(engine.config(), &state, &cafe, 0.0);
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_queue_is_filtered_sorted_and_bounded() {
        let zones = [
            zone("cafe", ZoneType::Food, 0.5),
            zone("well", ZoneType::Water, 0.5),
            zone("bed", ZoneType::Rest, 0.5),
            zone("bath", ZoneType::Hygiene, 0.5),
            zone("plaza", ZoneType::Social, 0.5),
        ];
        let (mut engine, id) = engine(&zones);
        let needs = Needs {
            hunger: 20.0,
            thirst: 10.0,
            energy: 20.0,
            hygiene: 10.0,
            social: 10.0,
            fun: 90.0,
            mental_health: 90.0,
        };
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        assert_eq!(goals.len(), 3);
        assert!(goals.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert!(goals.iter().all(|g| g.priority >= 0.2));
        assert_eq!(goals[0].target_need, Some(NeedType::Thirst));
    }

    #[test]
    fn test_opportunity_goals_follow_personality_and_needs() {
        let zones = [zone("office", ZoneType::Work, 0.5), zone("plaza", ZoneType::Social, 0.5)];
        let (mut engine, id) = engine(&zones);
        let mut state = engine.state(&id).unwrap();
        state.personality.work_ethic = 1.0;
        engine.restore(state);

        let mut needs = content();
        needs.social = 50.0;
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        let work = goals.iter().find(|g| g.goal_type == GoalType::Work).unwrap();
        assert!((work.priority - 0.6).abs() < 1e-5);
        assert!(goals.iter().any(|g| g.goal_type == GoalType::Socialize));

        needs.energy = 30.0;
        needs.social = 95.0;
        let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
        assert!(goals.iter().all(|g| g.goal_type != GoalType::Work));
        assert!(goals.iter().all(|g| g.goal_type != GoalType::Explore));
        assert!(goals.iter().all(|g| g.goal_type != GoalType::Socialize));
    }

    #[test]
    fn test_tick_promotes_goal_and_requests_travel() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut needs = content();
        needs.hunger = 20.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel::default();
        let mut rng = StdRng::seed_from_u64(1);

        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        let current = engine.current_goal(&id).unwrap();
        assert_eq!(current.target_zone, Some(ZoneId::from("cafe")));
        assert!((current.started_at.unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(travel.requests, vec![(id.clone(), ZoneId::from("cafe"))]);
        let state = engine.state(&id).unwrap();
        assert!(state.memory.has_visited(&ZoneId::from("cafe")));
        assert!(state.goal_queue.len() <= 2);
    }

    #[test]
    fn test_busy_agent_keeps_goal_queued() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut needs = content();
        needs.hunger = 20.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel {
            busy: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        assert!(engine.current_goal(&id).is_none());
        let state = engine.state(&id).unwrap();
        assert_eq!(state.goal_queue[0].target_need, Some(NeedType::Hunger));

        travel.busy = false;
        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        assert!(engine.current_goal(&id).is_some());
    }

    #[test]
    fn test_rejected_travel_records_failure() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut needs = content();
        needs.hunger = 20.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel {
            known: vec![ZoneId::from("elsewhere")],
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        assert!(engine.current_goal(&id).is_none());
        assert!(engine.state(&id).unwrap().memory.failure_count(&ZoneId::from("cafe")) >= 1);
    }

    #[test]
    fn test_goal_timeout_records_failure() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut needs = content();
        needs.hunger = 20.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel::default();
        let mut rng = StdRng::seed_from_u64(1);
        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        let first = engine.current_goal(&id).unwrap();

        for _ in 0..92 {
            engine.tick(1.0, &vitals, &mut travel, &mut rng);
        }
        let state = engine.state(&id).unwrap();
        assert!(state.memory.failure_count(&ZoneId::from("cafe")) >= 1);
        assert_ne!(state.current_goal.map(|g| g.id), Some(first.id));
    }

    #[test]
    fn test_notify_arrival_completes_matching_goal() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut needs = content();
        needs.hunger = 20.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel::default();
        let mut rng = StdRng::seed_from_u64(1);
        engine.tick(0.1, &vitals, &mut travel, &mut rng);

        assert!(engine.notify_arrival(&id, &ZoneId::from("park")).is_none());
        let done = engine.notify_arrival(&id, &ZoneId::from("cafe")).unwrap();
        assert_eq!(done.target_need, Some(NeedType::Hunger));
        assert!(engine.current_goal(&id).is_none());
        assert_eq!(engine.state(&id).unwrap().memory.success_count(&ZoneId::from("cafe")), 1);
    }

    #[test]
    fn test_player_control_clears_goals_and_pauses_decisions() {
        let (mut engine, id) = engine(&[
            zone("cafe", ZoneType::Food, 0.5),
            zone("well", ZoneType::Water, 0.5),
        ]);
        let mut needs = content();
        needs.hunger = 20.0;
        needs.thirst = 20.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel::default();
        let mut rng = StdRng::seed_from_u64(1);
        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        assert!(engine.current_goal(&id).is_some());

        assert!(engine.set_player_control(&id, true));
        let state = engine.state(&id).unwrap();
        assert!(state.current_goal.is_none());
        assert!(state.goal_queue.is_empty());

        for _ in 0..5 {
            engine.tick(1.0, &vitals, &mut travel, &mut rng);
        }
        assert!(engine.current_goal(&id).is_none());
        assert_eq!(travel.requests.len(), 1);

        engine.set_player_control(&id, false);
        engine.tick(1.0, &vitals, &mut travel, &mut rng);
        assert!(engine.current_goal(&id).is_some());
        assert!(!engine.set_player_control(&AgentId::from("ghost"), true));
    }

    #[test]
    fn test_survival_override_injects_top_goal() {
        let (mut engine, id) = engine(&[
            zone("well", ZoneType::Water, 0.5),
            zone("office", ZoneType::Work, 0.5),
        ]);
        let mut needs = content();
        needs.thirst = 35.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel::default();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(engine.set_priority_override(&id, PriorityOverride::Survival, &vitals));
        let state = engine.state(&id).unwrap();
        assert_eq!(state.goal_queue.len(), 1);
        assert_eq!(state.goal_queue[0].priority, 1.0);
        assert_eq!(state.goal_queue[0].target_zone, Some(ZoneId::from("well")));

        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        assert_eq!(engine.current_goal(&id).unwrap().priority, 1.0);
    }

    #[test]
    fn test_survival_override_waits_out_busy_agent() {
        let (mut engine, id) = engine(&[
            zone("well", ZoneType::Water, 0.5),
            zone("office", ZoneType::Work, 0.5),
        ]);
        let mut needs = content();
        needs.thirst = 60.0;
        let vitals = FakeVitals::with(&id, needs);
        let mut travel = FakeTravel {
            busy: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        assert!(engine.set_priority_override(&id, PriorityOverride::Survival, &vitals));
        for _ in 0..7 {
            engine.tick(1.0, &vitals, &mut travel, &mut rng);
        }
        let state = engine.state(&id).unwrap();
        assert!(state.current_goal.is_none());
        assert!(state.last_decision_at.unwrap() > 3.0);
        assert!(state.goal_queue[0].forced);
        assert_eq!(state.goal_queue[0].target_zone, Some(ZoneId::from("well")));
        assert!(state.goal_queue.len() <= 3);

        travel.busy = false;
        engine.tick(0.1, &vitals, &mut travel, &mut rng);
        let current = engine.current_goal(&id).unwrap();
        assert!(current.forced);
        assert_eq!(travel.requests, vec![(id.clone(), ZoneId::from("well"))]);
        assert!(engine.state(&id).unwrap().goal_queue.iter().all(|g| !g.forced));
    }

    #[test]
    fn test_risk_tolerance_softens_failure_memory() {
        let zones = [
            zone("diner", ZoneType::Food, 0.75),
            zone("cafe", ZoneType::Food, 0.6),
        ];
        let (mut engine, id) = engine(&zones);
        let mut needs = content();
        needs.hunger = 20.0;

        let mut target_for = |risk_tolerance: f32| {
            let mut state = engine.state(&id).unwrap();
            state.personality.risk_tolerance = risk_tolerance;
            state.memory = Default::default();
            state.memory.record_failure(&ZoneId::from("diner"));
            engine.restore(state);
            let goals = generate(&mut engine, &id, needs, &FakeTravel::default());
            goals[0].target_zone.clone()
        };
        assert_eq!(target_for(0.0), Some(ZoneId::from("cafe")));
        assert_eq!(target_for(1.0), Some(ZoneId::from("diner")));
    }

    #[test]
    fn test_missing_or_dead_vitals_skip_decisions() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let mut travel = FakeTravel::default();
        let mut rng = StdRng::seed_from_u64(1);
        engine.tick(1.0, &FakeVitals::default(), &mut travel, &mut rng);
        assert!(engine.state(&id).unwrap().last_decision_at.is_none());

        let mut vitals = FakeVitals::default();
        let mut needs = content();
        needs.hunger = 5.0;
        vitals.needs.insert(id.clone(), (needs, true));
        engine.tick(1.0, &vitals, &mut travel, &mut rng);
        assert!(travel.requests.is_empty());
    }

    #[test]
    fn test_decision_interval_respected() {
        let (mut engine, id) = engine(&[zone("cafe", ZoneType::Food, 0.5)]);
        let vitals = FakeVitals::with(&id, content());
        let mut travel = FakeTravel {
            busy: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        engine.tick(1.0, &vitals, &mut travel, &mut rng);
        let first = engine.state(&id).unwrap().last_decision_at;
        engine.tick(1.0, &vitals, &mut travel, &mut rng);
        assert_eq!(engine.state(&id).unwrap().last_decision_at, first);
        engine.tick(2.0, &vitals, &mut travel, &mut rng);
        assert_eq!(engine.state(&id).unwrap().last_decision_at, Some(4.0));
    }
}
