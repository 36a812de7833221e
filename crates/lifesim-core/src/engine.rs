//! Simulation engine - main entry point for running the simulation
//!
//! Owns the three subsystems plus the shared random source and caches, runs
//! them in a fixed order every tick and routes events between them.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{Read, Write};

use crate::cache::{PathCache, ZoneDistanceCache, ZoneDistanceEntry};
use crate::components::*;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::events::{SimEvent, SimObserver};
use crate::persistence::{read_save, write_save, AgentSnapshot, SaveData};
use crate::systems::*;

/// Parameters for a new agent
#[derive(Debug, Clone)]
pub struct AgentSpawn {
    pub id: AgentId,
    pub position: Vec2,
    /// Drawn from the configured high band when `None`
    pub needs: Option<Needs>,
    /// Random when `None`
    pub personality: Option<Personality>,
}

impl AgentSpawn {
    pub fn new(id: impl Into<String>, position: Vec2) -> Self {
        Self {
            id: AgentId::new(id),
            position,
            needs: None,
            personality: None,
        }
    }

    pub fn with_needs(mut self, needs: Needs) -> Self {
        self.needs = Some(needs);
        self
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = Some(personality);
        self
    }
}

/// Activity an agent settles into after completing a goal at a zone
pub fn arrival_activity(zone_type: ZoneType) -> Option<Activity> {
    match zone_type {
        ZoneType::Food | ZoneType::Water | ZoneType::Market => Some(Activity::Eating),
        ZoneType::Rest | ZoneType::Shelter => Some(Activity::Resting),
        ZoneType::Work => Some(Activity::Working),
        ZoneType::Social | ZoneType::Entertainment => Some(Activity::Socializing),
        ZoneType::Hygiene | ZoneType::Medical | ZoneType::Park | ZoneType::Library => None,
    }
}

/// Main simulation engine
pub struct SimulationEngine {
    config: SimConfig,
    vitals: VitalsModel,
    locomotion: Locomotion,
    decision: DecisionEngine,
    rng: StdRng,
    /// Simulation time in seconds since start
    sim_time: f64,
    observers: Vec<Box<dyn SimObserver>>,
    /// Routed events not yet drained by the host
    outbox: Vec<SimEvent>,
}

impl SimulationEngine {
    /// Create a new empty simulation
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let path_cache = PathCache::from_config(&config.locomotion);
        let distances = ZoneDistanceCache::new();
        Self {
            vitals: VitalsModel::new(config.vitals.clone()),
            locomotion: Locomotion::new(config.locomotion.clone(), path_cache, distances),
            decision: DecisionEngine::new(config.decision.clone()),
            rng,
            sim_time: 0.0,
            observers: Vec::new(),
            outbox: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Install a new world snapshot ("world changed" notification)
    pub fn set_world(&mut self, world: WorldSnapshot) {
        self.vitals.set_zones(&world.zones);
        self.decision.set_zones(&world.zones);
        self.locomotion.set_world(world);
        self.locomotion.precompute_zone_distances();
    }

    pub fn world(&self) -> &WorldSnapshot {
        self.locomotion.world()
    }

    pub fn spawn_agent(&mut self, spawn: AgentSpawn) -> SimResult<()> {
        let AgentSpawn {
            id,
            position,
            needs,
            personality,
        } = spawn;
        if self.vitals.contains(&id) {
            return Err(SimError::DuplicateAgent(id));
        }
        let personality = personality.unwrap_or_else(|| Personality::random(&mut self.rng));

        self.vitals.initialize(id.clone(), needs, &mut self.rng);
        self.locomotion.add_agent(id.clone(), position);
        self.decision.add_agent(id.clone(), personality);

        let zone = self.locomotion.state(&id).and_then(|s| s.current_zone);
        self.vitals.set_zone(&id, zone);
        log::info!("Spawned agent {} at ({:.0}, {:.0})", id, position.x, position.y);
        Ok(())
    }

    /// Remove an agent from every subsystem
    pub fn despawn_agent(&mut self, agent: &AgentId) -> bool {
        let removed = self.vitals.remove(agent).is_some();
        self.locomotion.remove(agent);
        self.decision.remove(agent);
        if !removed {
            log::warn!("despawn_agent: unknown agent {}", agent);
        }
        removed
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids = self.vitals.agent_ids();
        ids.sort();
        ids
    }

    pub fn agent_count(&self) -> usize {
        self.vitals.agent_ids().len()
    }

    /// Update the simulation by delta_seconds.
    ///
    /// Phase order is vitals, then locomotion, then decisions, so decisions
    /// see fresh needs and zone benefits follow post-movement zones.
    pub fn update(&mut self, delta_seconds: f32) {
        let delta = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            log::warn!("Ignoring non-finite tick delta");
            0.0
        };
        self.sim_time += delta as f64;

        self.vitals.tick(delta);
        let events = self.vitals.drain_events();
        self.route(events);

        self.locomotion.tick(delta);
        let events = self.locomotion.drain_events();
        self.route(events);

        self.decision
            .tick(delta, &self.vitals, &mut self.locomotion, &mut self.rng);
        let events = self.locomotion.drain_events();
        self.route(events);
    }

    /// Apply cross-subsystem consequences, then publish
    fn route(&mut self, events: Vec<SimEvent>) {
        for event in events {
            match &event {
                SimEvent::EntityDeath { agent, .. } => {
                    self.locomotion.halt(agent);
                    self.decision.clear_goals(agent);
                }
                SimEvent::EntityRespawn { agent, position, .. } => {
                    self.locomotion.teleport(agent, *position);
                    self.decision.clear_goals(agent);
                    self.vitals.set_zone(agent, None);
                }
                SimEvent::MovementStarted { agent, .. } => {
                    self.vitals.set_zone(agent, None);
                }
                SimEvent::ArrivedAtZone { agent, zone } => {
                    self.vitals.set_zone(agent, Some(zone.clone()));
                    if self.decision.notify_arrival(agent, zone).is_some() {
                        self.start_arrival_activity(agent, zone);
                    }
                }
                SimEvent::NeedsSatisfied { .. }
                | SimEvent::ActivityCompleted { .. }
                | SimEvent::EmergencyLevelChanged { .. } => {}
            }
            for observer in self.observers.iter_mut() {
                observer.on_event(&event);
            }
            self.outbox.push(event);
        }
    }

    fn start_arrival_activity(&mut self, agent: &AgentId, zone: &ZoneId) {
        let Some(activity) = self
            .locomotion
            .world()
            .zone(zone)
            .and_then(|z| arrival_activity(z.zone_type))
        else {
            return;
        };
        let duration = self.config.decision.arrival_activity_secs.get(activity);
        if let Err(err) = self.locomotion.start_activity(agent, activity, duration) {
            log::debug!("Agent {} could not start {:?} at {}: {}", agent, activity, zone, err);
        }
    }

    fn flush_vitals(&mut self) {
        let events = self.vitals.drain_events();
        self.route(events);
    }

    pub fn add_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.push(observer);
    }

    /// Events routed since the last call, in emission order
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    // --- Vitals ---

    pub fn satisfy_need(&mut self, agent: &AgentId, need: NeedType, amount: f32) -> bool {
        let applied = self.vitals.satisfy_need(agent, need, amount);
        self.flush_vitals();
        applied
    }

    pub fn modify_need_by_key(&mut self, agent: &AgentId, key: &str, delta: f32) -> SimResult<f32> {
        let result = self.vitals.modify_need_by_key(agent, key, delta);
        self.flush_vitals();
        result
    }

    pub fn needs(&self, agent: &AgentId) -> Option<Needs> {
        self.vitals.get_entity_needs(agent)
    }

    pub fn vitals(&self, agent: &AgentId) -> Option<AgentVitals> {
        self.vitals.vitals(agent)
    }

    pub fn vitals_model(&self) -> &VitalsModel {
        &self.vitals
    }

    // --- Locomotion ---

    /// Player-directed travel. Dead agents cannot move.
    pub fn move_to_zone(&mut self, agent: &AgentId, zone: &ZoneId) -> SimResult<TravelPlan> {
        if self.vitals.is_dead(agent) {
            return Err(SimError::AgentDead(agent.clone()));
        }
        let plan = self.locomotion.move_to_zone(agent, zone)?;
        let events = self.locomotion.drain_events();
        self.route(events);
        Ok(plan)
    }

    pub fn start_activity(
        &mut self,
        agent: &AgentId,
        activity: Activity,
        duration_secs: f32,
    ) -> SimResult<()> {
        if self.vitals.is_dead(agent) {
            return Err(SimError::AgentDead(agent.clone()));
        }
        self.locomotion.start_activity(agent, activity, duration_secs)
    }

    pub fn estimate_travel(&mut self, from: &ZoneId, to: &ZoneId) -> Option<ZoneDistanceEntry> {
        self.locomotion.estimate_travel(from, to)
    }

    pub fn locomotion_state(&self, agent: &AgentId) -> Option<LocomotionState> {
        self.locomotion.state(agent)
    }

    pub fn position(&self, agent: &AgentId) -> Option<Vec2> {
        self.locomotion.position(agent)
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    // --- Decisions ---

    pub fn set_player_control(&mut self, agent: &AgentId, enabled: bool) -> bool {
        self.decision.set_player_control(agent, enabled)
    }

    /// Force a top-priority goal. Travel or a blocking activity in progress
    /// is abandoned so the goal starts on the next update.
    pub fn set_priority_override(&mut self, agent: &AgentId, mode: PriorityOverride) -> bool {
        if !self.decision.set_priority_override(agent, mode, &self.vitals) {
            return false;
        }
        self.locomotion.halt(agent);
        true
    }

    pub fn current_goal(&self, agent: &AgentId) -> Option<AgentGoal> {
        self.decision.current_goal(agent)
    }

    pub fn decision_state(&self, agent: &AgentId) -> Option<AgentDecisionState> {
        self.decision.state(agent)
    }

    pub fn decision(&self) -> &DecisionEngine {
        &self.decision
    }

    // --- Persistence ---

    pub fn snapshot_agent(&self, agent: &AgentId) -> Option<AgentSnapshot> {
        Some(AgentSnapshot {
            vitals: self.vitals.vitals(agent)?,
            locomotion: self.locomotion.state(agent)?,
            decision: self.decision.state(agent)?,
        })
    }

    /// Install a snapshot, replacing any existing records for that agent
    pub fn restore_agent(&mut self, snapshot: AgentSnapshot) -> SimResult<()> {
        if !snapshot.is_consistent() {
            return Err(SimError::UnknownAgent(snapshot.agent_id().clone()));
        }
        let AgentSnapshot {
            vitals,
            locomotion,
            decision,
        } = snapshot;
        self.vitals.restore(vitals);
        self.locomotion.restore(locomotion);
        self.decision.restore(decision);
        Ok(())
    }

    /// Save the complete simulation to a writer
    pub fn save<W: Write>(&self, writer: W) -> SimResult<()> {
        let agents = self
            .agent_ids()
            .iter()
            .filter_map(|id| self.snapshot_agent(id))
            .collect();
        write_save(writer, &SaveData::new(self.sim_time, agents))?;
        Ok(())
    }

    /// Load a simulation from a reader. The current world snapshot is kept.
    pub fn load<R: Read>(&mut self, reader: R) -> SimResult<()> {
        let data = read_save(reader)?;

        for id in self.agent_ids() {
            self.despawn_agent(&id);
        }
        for snapshot in data.agents {
            self.restore_agent(snapshot)?;
        }
        self.sim_time = data.sim_time;
        self.vitals.restore_clock(data.sim_time);
        self.locomotion.restore_clock(data.sim_time);
        self.locomotion.invalidate_paths();
        self.decision.restore_clock(data.sim_time);
        self.outbox.clear();
        log::info!("Loaded {} agents at t={:.1}s", self.agent_count(), self.sim_time);
        Ok(())
    }
}
