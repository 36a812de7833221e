//! Vitals system - need decay, emergency classification, zone benefits, death and respawn.

use std::collections::BTreeMap;

use crate::arena::AgentArena;
use crate::components::{
    AgentId, AgentVitals, EmergencyLevel, NeedType, Needs, Vec2, Zone, ZoneId,
};
use crate::config::VitalsConfig;
use crate::error::{SimError, SimResult};
use crate::events::{EventQueue, SimEvent};

const DEATH_NEEDS: [NeedType; 3] = [NeedType::Hunger, NeedType::Energy, NeedType::MentalHealth];
const DYING_NEEDS: [NeedType; 4] = [
    NeedType::Hunger,
    NeedType::Thirst,
    NeedType::Energy,
    NeedType::MentalHealth,
];

/// Read-only view of an agent's vitals handed to the decision engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalsSnapshot {
    pub needs: Needs,
    pub emergency: EmergencyLevel,
    pub is_dead: bool,
}

/// Source of per-agent vitals snapshots
pub trait NeedsSource {
    fn needs_snapshot(&self, agent: &AgentId) -> Option<VitalsSnapshot>;
}

/// Classify overall severity from a needs snapshot.
///
/// Dying: two of hunger/thirst/energy/mental health at or below the dying
/// threshold, or thirst alone below the dying-thirst threshold.
pub fn classify_emergency(needs: &Needs, config: &VitalsConfig) -> EmergencyLevel {
    if needs.count_at_or_below(&DYING_NEEDS, config.dying_threshold) >= 2
        || needs.thirst < config.dying_thirst_threshold
    {
        return EmergencyLevel::Dying;
    }
    let (_, lowest) = needs.lowest();
    if lowest <= config.critical_threshold {
        EmergencyLevel::Critical
    } else if lowest <= config.warning_threshold {
        EmergencyLevel::Warning
    } else {
        EmergencyLevel::None
    }
}

/// Two of hunger/energy/mental health at or below the death threshold
pub fn meets_death_rule(needs: &Needs, config: &VitalsConfig) -> bool {
    needs.count_at_or_below(&DEATH_NEEDS, config.death_threshold) >= 2
}

/// Deterministic spawn point for an agent (FNV-1a over the id)
pub fn spawn_point_for(agent: &AgentId, config: &VitalsConfig) -> Vec2 {
    if config.spawn_points.is_empty() {
        return Vec2::ZERO;
    }
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in agent.as_str().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    config.spawn_points[(hash % config.spawn_points.len() as u64) as usize]
}

fn apply_decay(needs: &mut Needs, config: &VitalsConfig, minutes: f32) {
    for need in NeedType::ALL {
        needs.adjust(need, -config.decay_per_minute.get(need) * minutes);
    }
}

/// Extreme hunger/thirst drains energy and mental health. Gated on the
/// threshold so moderate deficits never compound.
fn apply_cross_effects(needs: &mut Needs, config: &VitalsConfig, minutes: f32) {
    if needs.hunger <= config.cross_effect_threshold {
        needs.adjust(NeedType::Energy, -config.starvation_energy_drain_per_minute * minutes);
        needs.adjust(
            NeedType::MentalHealth,
            -config.starvation_mental_drain_per_minute * minutes,
        );
    }
    if needs.thirst <= config.cross_effect_threshold {
        needs.adjust(NeedType::Energy, -config.dehydration_energy_drain_per_minute * minutes);
        needs.adjust(
            NeedType::MentalHealth,
            -config.dehydration_mental_drain_per_minute * minutes,
        );
    }
}

fn apply_zone_benefit(
    vitals: &mut AgentVitals,
    zones: &[Zone],
    config: &VitalsConfig,
    minutes: f32,
) {
    let Some(zone_id) = vitals.current_zone.as_ref() else {
        return;
    };
    let Some(zone) = zones.iter().find(|z| &z.id == zone_id) else {
        return;
    };
    let mut gained = 0.0;
    for &(need, weight) in zone.zone_type.benefits() {
        let applied = vitals
            .needs
            .adjust(need, config.zone_benefit_per_minute * weight * minutes);
        if applied > 0.0 {
            gained += applied;
        }
    }
    vitals.record_source(gained);
}

fn apply_recovery_floor(needs: &mut Needs, floor: f32) {
    for need in NeedType::ALL {
        if needs.get(need) < floor {
            needs.set(need, floor);
        }
    }
}

/// Recompute the emergency level, emitting an event when it changes
fn refresh_emergency(vitals: &mut AgentVitals, config: &VitalsConfig, events: &mut EventQueue) {
    let level = classify_emergency(&vitals.needs, config);
    if level != vitals.emergency {
        events.push(SimEvent::EmergencyLevelChanged {
            agent: vitals.agent_id.clone(),
            from: vitals.emergency,
            to: level,
        });
        vitals.emergency = level;
    }
}

/// Owns every agent's needs
pub struct VitalsModel {
    config: VitalsConfig,
    agents: AgentArena<AgentVitals>,
    zones: Vec<Zone>,
    clock: f64,
    events: EventQueue,
}

impl VitalsModel {
    pub fn new(config: VitalsConfig) -> Self {
        Self {
            config,
            agents: AgentArena::new(),
            zones: Vec::new(),
            clock: 0.0,
            events: EventQueue::new(),
        }
    }

    pub fn config(&self) -> &VitalsConfig {
        &self.config
    }

    /// Register an agent. Without explicit needs, values are drawn from the
    /// configured high band. Re-initializing an agent resets it.
    pub fn initialize(&mut self, agent: AgentId, initial: Option<Needs>, rng: &mut impl rand::Rng) {
        let needs = initial.unwrap_or_else(|| {
            let (low, high) = self.config.initial_band;
            Needs::random_in_band(rng, low, high)
        });
        let mut vitals = AgentVitals::new(agent.clone(), needs);
        vitals.emergency = classify_emergency(&vitals.needs, &self.config);
        self.agents.insert(agent, vitals);
    }

    /// Put back a previously captured record as-is
    pub fn restore(&mut self, vitals: AgentVitals) {
        let mut vitals = vitals;
        vitals.needs.clamp_all();
        vitals.emergency = classify_emergency(&vitals.needs, &self.config);
        self.agents.insert(vitals.agent_id.clone(), vitals);
    }

    pub fn remove(&mut self, agent: &AgentId) -> Option<AgentVitals> {
        self.agents.remove(agent)
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        self.agents.contains(agent)
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.ids()
    }

    /// Replace the zone snapshot used for benefits and recommendations
    pub fn set_zones(&mut self, zones: &[Zone]) {
        self.zones = zones.to_vec();
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn restore_clock(&mut self, now: f64) {
        self.clock = now;
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Advance all agents by `delta_seconds`.
    ///
    /// A delta above `max_tick_delta_secs` is treated as a stall: decay is
    /// skipped and every need below `recovery_floor` is raised to it.
    pub fn tick(&mut self, delta_seconds: f32) {
        let delta = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            0.0
        };
        let stalled = delta > self.config.max_tick_delta_secs;
        if stalled {
            log::warn!(
                "Suspicious tick delta {:.2}s (max {:.2}s); running recovery pass instead of decay",
                delta,
                self.config.max_tick_delta_secs
            );
        }

        self.clock += delta as f64;
        let now = self.clock;
        let minutes = delta / 60.0;

        for (agent, vitals) in self.agents.iter_mut() {
            if vitals.is_dead {
                if vitals.respawn_at.map(|at| now >= at).unwrap_or(true) {
                    let position = spawn_point_for(agent, &self.config);
                    vitals.needs = self.config.respawn_needs;
                    vitals.needs.clamp_all();
                    vitals.is_dead = false;
                    vitals.death_time = None;
                    vitals.respawn_at = None;
                    vitals.current_zone = None;
                    refresh_emergency(vitals, &self.config, &mut self.events);
                    log::info!(
                        "Agent {} respawned at ({:.0}, {:.0})",
                        agent,
                        position.x,
                        position.y
                    );
                    self.events.push(SimEvent::EntityRespawn {
                        agent: agent.clone(),
                        position,
                        at: now,
                    });
                }
                continue;
            }

            if stalled {
                apply_recovery_floor(&mut vitals.needs, self.config.recovery_floor);
            } else {
                apply_decay(&mut vitals.needs, &self.config, minutes);
                apply_cross_effects(&mut vitals.needs, &self.config, minutes);
                vitals.needs.clamp_all();
                apply_zone_benefit(vitals, &self.zones, &self.config, minutes);
            }
            vitals.needs.clamp_all();
            refresh_emergency(vitals, &self.config, &mut self.events);

            if meets_death_rule(&vitals.needs, &self.config) {
                vitals.is_dead = true;
                vitals.death_time = Some(now);
                vitals.respawn_at = Some(now + self.config.respawn_delay_secs as f64);
                log::info!(
                    "Agent {} died (hunger {:.1}, energy {:.1}, mental health {:.1})",
                    agent,
                    vitals.needs.hunger,
                    vitals.needs.energy,
                    vitals.needs.mental_health
                );
                self.events.push(SimEvent::EntityDeath {
                    agent: agent.clone(),
                    at: now,
                });
            }
        }
    }

    /// Raise a need by `amount` (clamped to 100), crediting the current zone.
    /// Non-positive amounts are ignored.
    pub fn satisfy_need(&mut self, agent: &AgentId, need: NeedType, amount: f32) -> bool {
        let Some(vitals) = self.agents.get_mut(agent) else {
            log::warn!("satisfy_need: unknown agent {}", agent);
            return false;
        };
        if vitals.is_dead {
            log::debug!("satisfy_need: agent {} is dead", agent);
            return false;
        }
        if !amount.is_finite() || amount <= 0.0 {
            log::debug!("satisfy_need: ignoring non-positive amount {} for {}", amount, agent);
            return false;
        }
        let applied = vitals.needs.adjust(need, amount);
        vitals.record_source(applied);
        refresh_emergency(vitals, &self.config, &mut self.events);
        self.events.push(SimEvent::NeedsSatisfied {
            agent: agent.clone(),
            need,
            amount: applied,
            zone: vitals.current_zone.clone(),
        });
        true
    }

    /// Change a need addressed by its string key. Returns the applied delta.
    pub fn modify_need_by_key(&mut self, agent: &AgentId, key: &str, delta: f32) -> SimResult<f32> {
        let need: NeedType = key.parse().map_err(|err| {
            log::warn!("modify_need_by_key: {} (agent {})", err, agent);
            err
        })?;
        let Some(vitals) = self.agents.get_mut(agent) else {
            log::warn!("modify_need_by_key: unknown agent {}", agent);
            return Err(SimError::UnknownAgent(agent.clone()));
        };
        if !delta.is_finite() {
            return Ok(0.0);
        }
        let applied = vitals.needs.adjust(need, delta);
        refresh_emergency(vitals, &self.config, &mut self.events);
        Ok(applied)
    }

    pub fn set_zone(&mut self, agent: &AgentId, zone: Option<ZoneId>) {
        match self.agents.get_mut(agent) {
            Some(vitals) => vitals.current_zone = zone,
            None => log::warn!("set_zone: unknown agent {}", agent),
        }
    }

    pub fn get_entity_needs(&self, agent: &AgentId) -> Option<Needs> {
        let needs = self.agents.get(agent).map(|v| v.needs);
        if needs.is_none() {
            log::warn!("get_entity_needs: unknown agent {}", agent);
        }
        needs
    }

    pub fn vitals(&self, agent: &AgentId) -> Option<AgentVitals> {
        self.agents.get_cloned(agent)
    }

    pub fn emergency_level(&self, agent: &AgentId) -> Option<EmergencyLevel> {
        self.agents.get(agent).map(|v| v.emergency)
    }

    pub fn is_dead(&self, agent: &AgentId) -> bool {
        self.agents.get(agent).map(|v| v.is_dead).unwrap_or(false)
    }

    pub fn satisfaction_sources(&self, agent: &AgentId) -> Option<BTreeMap<ZoneId, f32>> {
        self.agents.get(agent).map(|v| v.satisfaction_sources.clone())
    }

    /// Lowest need of the agent
    pub fn get_most_critical_need(&self, agent: &AgentId) -> Option<(NeedType, f32)> {
        let Some(vitals) = self.agents.get(agent) else {
            log::warn!("get_most_critical_need: unknown agent {}", agent);
            return None;
        };
        Some(vitals.needs.lowest())
    }

    /// Zones that restore `need`, most attractive first
    pub fn get_recommended_zones_for_need(&self, need: NeedType) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self
            .zones
            .iter()
            .filter(|z| z.zone_type.serves(need))
            .collect();
        zones.sort_by(|a, b| {
            b.attractiveness
                .partial_cmp(&a.attractiveness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        zones
    }

    pub fn spawn_point(&self, agent: &AgentId) -> Vec2 {
        spawn_point_for(agent, &self.config)
    }
}

impl NeedsSource for VitalsModel {
    fn needs_snapshot(&self, agent: &AgentId) -> Option<VitalsSnapshot> {
        self.agents.get(agent).map(|v| VitalsSnapshot {
            needs: v.needs,
            emergency: v.emergency,
            is_dead: v.is_dead,
        })
    }
}
