//! Locomotion system - travel along planned paths, timed activities, fatigue.

use crate::arena::AgentArena;
use crate::cache::{PathCache, TravelDifficulty, ZoneDistanceCache, ZoneDistanceEntry};
use crate::components::{Activity, AgentId, LocomotionState, Vec2, WorldSnapshot, ZoneId};
use crate::config::LocomotionConfig;
use crate::error::{SimError, SimResult};
use crate::events::{EventQueue, SimEvent};
use crate::pathfinding::{path_length, plan_path, ObstacleGrid, PathResult};

/// Accepted travel request
#[derive(Debug, Clone, PartialEq)]
pub struct TravelPlan {
    pub agent: AgentId,
    pub zone: ZoneId,
    pub path: Vec<Vec2>,
    /// False when the path is a direct fallback
    pub path_found: bool,
    pub distance: f32,
    /// Seconds
    pub estimated_time: f32,
}

/// Travel requests as seen by the decision engine
pub trait TravelPlanner {
    fn request_travel(&mut self, agent: &AgentId, zone: &ZoneId) -> SimResult<TravelPlan>;

    /// Best known distance from the agent to the zone
    fn distance_to_zone(&self, agent: &AgentId, zone: &ZoneId) -> Option<f32>;
}

/// Travel time in seconds for `distance` at the given fatigue
pub fn travel_time(distance: f32, fatigue: f32, config: &LocomotionConfig) -> f32 {
    if config.base_speed <= 0.0 {
        return 0.0;
    }
    let divisor = 1.0 + (fatigue.clamp(0.0, 100.0) / 100.0) * config.fatigue_speed_penalty;
    distance / (config.base_speed / divisor)
}

/// Point at `fraction` of the path's arc length
pub fn point_along(path: &[Vec2], fraction: f32) -> Option<Vec2> {
    let first = *path.first()?;
    let total = path_length(path);
    if total <= f32::EPSILON {
        return path.last().copied();
    }
    let mut remaining = total * fraction.clamp(0.0, 1.0);
    for w in path.windows(2) {
        let segment = w[0].distance(&w[1]);
        if remaining <= segment {
            let t = if segment > 0.0 { remaining / segment } else { 1.0 };
            return Some(w[0].lerp(&w[1], t));
        }
        remaining -= segment;
    }
    path.last().copied().or(Some(first))
}

pub struct Locomotion {
    config: LocomotionConfig,
    agents: AgentArena<LocomotionState>,
    world: WorldSnapshot,
    grid: ObstacleGrid,
    path_cache: PathCache,
    distances: ZoneDistanceCache,
    clock: f64,
    events: EventQueue,
}

impl Locomotion {
    pub fn new(
        config: LocomotionConfig,
        path_cache: PathCache,
        distances: ZoneDistanceCache,
    ) -> Self {
        let world = WorldSnapshot::default();
        let grid = ObstacleGrid::from_world(&world, config.tile_size);
        Self {
            config,
            agents: AgentArena::new(),
            world,
            grid,
            path_cache,
            distances,
            clock: 0.0,
            events: EventQueue::new(),
        }
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    /// Replace the world snapshot. Rebuilds the obstacle grid and drops all
    /// cached routes.
    pub fn set_world(&mut self, world: WorldSnapshot) {
        self.grid = ObstacleGrid::from_world(&world, self.config.tile_size);
        self.world = world;
        self.path_cache.invalidate();
        self.distances.invalidate();
        log::info!(
            "Obstacle grid rebuilt: {}x{} tiles, {} zones",
            self.grid.cols(),
            self.grid.rows(),
            self.world.zones.len()
        );
    }

    pub fn world(&self) -> &WorldSnapshot {
        &self.world
    }

    pub fn grid(&self) -> &ObstacleGrid {
        &self.grid
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.path_cache
    }

    pub fn zone_distances(&self) -> &ZoneDistanceCache {
        &self.distances
    }

    pub fn add_agent(&mut self, agent: AgentId, position: Vec2) {
        let mut state = LocomotionState::new(agent.clone(), position);
        state.current_zone = self.world.zone_at(&position).map(|z| z.id.clone());
        self.agents.insert(agent, state);
    }

    pub fn restore(&mut self, state: LocomotionState) {
        self.agents.insert(state.agent_id.clone(), state);
    }

    pub fn remove(&mut self, agent: &AgentId) -> Option<LocomotionState> {
        self.agents.remove(agent)
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        self.agents.contains(agent)
    }

    pub fn state(&self, agent: &AgentId) -> Option<LocomotionState> {
        self.agents.get_cloned(agent)
    }

    pub fn position(&self, agent: &AgentId) -> Option<Vec2> {
        self.agents.get(agent).map(|s| s.position)
    }

    pub fn activity(&self, agent: &AgentId) -> Option<Activity> {
        self.agents.get(agent).map(|s| s.activity)
    }

    pub fn is_moving(&self, agent: &AgentId) -> bool {
        self.agents.get(agent).map(|s| s.is_moving()).unwrap_or(false)
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn restore_clock(&mut self, now: f64) {
        self.clock = now;
    }

    /// Drop cached routes; their timestamps are meaningless after a clock reset
    pub fn invalidate_paths(&mut self) {
        self.path_cache.invalidate();
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Start travelling to the center of `zone`.
    ///
    /// Rejected while the agent is already moving or busy with a blocking
    /// activity; socializing is interrupted.
    pub fn move_to_zone(&mut self, agent: &AgentId, zone: &ZoneId) -> SimResult<TravelPlan> {
        let (position, fatigue) = {
            let state = self
                .agents
                .get(agent)
                .ok_or_else(|| SimError::UnknownAgent(agent.clone()))?;
            if state.is_moving() || state.activity.is_blocking() {
                return Err(SimError::AgentBusy {
                    agent: agent.clone(),
                    activity: state.activity,
                });
            }
            (state.position, state.fatigue)
        };
        let target = self
            .world
            .zone(zone)
            .map(|z| z.center())
            .ok_or_else(|| SimError::UnknownZone(zone.clone()))?;

        let result = self.route(position, zone, target);
        let distance = result.length();
        let estimated_time = travel_time(distance, fatigue, &self.config);
        let now = self.clock;

        if let Some(state) = self.agents.get_mut(agent) {
            state.activity = Activity::Moving;
            state.path = result.path.clone();
            state.target_position = result.destination();
            state.target_zone = Some(zone.clone());
            state.current_zone = None;
            state.activity_started_at = now;
            state.activity_duration = estimated_time;
        }

        log::debug!(
            "Agent {} heading to {} ({:.0} units, {:.1}s{})",
            agent,
            zone,
            distance,
            estimated_time,
            if result.success { "" } else { ", direct fallback" }
        );
        self.events.push(SimEvent::MovementStarted {
            agent: agent.clone(),
            zone: zone.clone(),
            path_found: result.success,
        });

        Ok(TravelPlan {
            agent: agent.clone(),
            zone: zone.clone(),
            path: result.path,
            path_found: result.success,
            distance,
            estimated_time,
        })
    }

    /// Cached path keyed by start tile and zone, re-anchored at `from`
    fn route(&mut self, from: Vec2, zone: &ZoneId, target: Vec2) -> PathResult {
        let start = self.grid.cell_of(from);
        if let Some(mut cached) = self.path_cache.get(start, zone, self.clock) {
            if let Some(first) = cached.path.first_mut() {
                *first = from;
            }
            return cached;
        }
        let result = plan_path(&self.grid, from, target, &self.config);
        self.path_cache
            .insert(start, zone.clone(), result.clone(), self.clock);
        result
    }

    /// Begin a timed activity. Only idle agents can start one.
    pub fn start_activity(
        &mut self,
        agent: &AgentId,
        activity: Activity,
        duration_secs: f32,
    ) -> SimResult<()> {
        if !activity.is_timed() {
            return Err(SimError::InvalidActivity(activity));
        }
        let now = self.clock;
        let state = self
            .agents
            .get_mut(agent)
            .ok_or_else(|| SimError::UnknownAgent(agent.clone()))?;
        if !state.is_idle() {
            return Err(SimError::AgentBusy {
                agent: agent.clone(),
                activity: state.activity,
            });
        }
        state.activity = activity;
        state.activity_started_at = now;
        state.activity_duration = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            0.0
        };
        Ok(())
    }

    /// Stop where the agent stands
    pub fn halt(&mut self, agent: &AgentId) {
        if let Some(state) = self.agents.get_mut(agent) {
            state.halt();
        }
    }

    /// Place the agent at `position`, dropping any travel or activity
    pub fn teleport(&mut self, agent: &AgentId, position: Vec2) {
        match self.agents.get_mut(agent) {
            Some(state) => {
                state.halt();
                state.position = position;
                state.current_zone = None;
            }
            None => log::warn!("teleport: unknown agent {}", agent),
        }
    }

    pub fn tick(&mut self, delta_seconds: f32) {
        let delta = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            0.0
        };
        self.clock += delta as f64;
        let now = self.clock;

        for (agent, state) in self.agents.iter_mut() {
            match state.activity {
                Activity::Moving => {
                    state.fatigue += self.config.fatigue_gain_per_sec * delta;
                    let progress = state.progress(now);
                    if progress >= 1.0 {
                        let end = state.target_position.or_else(|| state.path.last().copied());
                        if let Some(end) = end {
                            state.position = end;
                        }
                        let zone = state.target_zone.take();
                        state.halt();
                        state.current_zone = zone.clone();
                        if let Some(zone) = zone {
                            self.events.push(SimEvent::ArrivedAtZone {
                                agent: agent.clone(),
                                zone,
                            });
                        }
                    } else if let Some(point) = point_along(&state.path, progress) {
                        state.position = point;
                    }
                }
                Activity::Idle => {
                    state.fatigue -= self.config.fatigue_idle_decay_per_sec * delta;
                }
                timed => {
                    let recovery = if timed == Activity::Resting {
                        self.config.fatigue_rest_recovery_per_sec
                    } else {
                        self.config.fatigue_idle_decay_per_sec
                    };
                    state.fatigue -= recovery * delta;
                    if state.progress(now) >= 1.0 {
                        state.activity = Activity::Idle;
                        state.activity_duration = 0.0;
                        self.events.push(SimEvent::ActivityCompleted {
                            agent: agent.clone(),
                            activity: timed,
                        });
                    }
                }
            }
            state.fatigue = state.fatigue.clamp(0.0, 100.0);
        }
    }

    /// Center-to-center travel estimate between two zones, cached per pair
    pub fn estimate_travel(&mut self, from: &ZoneId, to: &ZoneId) -> Option<ZoneDistanceEntry> {
        if let Some(entry) = self.distances.get(from, to) {
            return Some(entry.clone());
        }
        let (Some(a), Some(b)) = (self.world.zone(from), self.world.zone(to)) else {
            log::warn!("estimate_travel: unknown zone in {} -> {}", from, to);
            return None;
        };
        let distance = a.center().distance(&b.center());
        let entry = ZoneDistanceEntry {
            from: from.clone(),
            to: to.clone(),
            distance,
            travel_time: travel_time(distance, 0.0, &self.config),
            difficulty: TravelDifficulty::classify(distance, &self.config),
        };
        self.distances.insert(entry.clone());
        Some(entry)
    }

    /// Fill the zone-pair cache for every ordered pair in the current world
    pub fn precompute_zone_distances(&mut self) {
        let ids: Vec<ZoneId> = self.world.zones.iter().map(|z| z.id.clone()).collect();
        for from in &ids {
            for to in &ids {
                if from != to {
                    self.estimate_travel(from, to);
                }
            }
        }
    }
}

impl TravelPlanner for Locomotion {
    fn request_travel(&mut self, agent: &AgentId, zone: &ZoneId) -> SimResult<TravelPlan> {
        self.move_to_zone(agent, zone)
    }

    fn distance_to_zone(&self, agent: &AgentId, zone: &ZoneId) -> Option<f32> {
        let state = self.agents.get(agent)?;
        let target = self.world.zone(zone)?;
        if let Some(from) = state.current_zone.as_ref() {
            if from == zone {
                return Some(0.0);
            }
            if let Some(entry) = self.distances.get(from, zone) {
                return Some(entry.distance);
            }
        }
        Some(state.position.distance(&target.center()))
    }
}
