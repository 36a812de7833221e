//! LifeSim Headless Simulation Harness
//!
//! Loads the demo world, runs the engine in-process and checks the
//! behavioural guarantees. No rendering, no wall clock.
//!
//! Usage:
//!   cargo run -p lifesim-simtest
//!   cargo run -p lifesim-simtest -- --verbose

use lifesim_core::config::SimConfig;
use lifesim_core::pathfinding::{plan_path, ObstacleGrid};
use lifesim_core::prelude::*;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// ── Demo world (config overrides, zones, obstacles, agents) ─────────────
const DEMO_WORLD_JSON: &str = include_str!("../../../data/demo_world.json");

#[derive(Debug, Deserialize)]
struct DemoFile {
    #[serde(default)]
    config: SimConfig,
    world: WorldSnapshot,
    agents: Vec<DemoAgent>,
}

#[derive(Debug, Deserialize)]
struct DemoAgent {
    id: String,
    position: Vec2,
    needs: Option<Needs>,
    personality: Option<Personality>,
}

impl DemoAgent {
    fn spawn(&self) -> AgentSpawn {
        let mut spawn = AgentSpawn::new(self.id.as_str(), self.position);
        spawn.needs = self.needs;
        spawn.personality = self.personality;
        spawn
    }
}

const TICK: f32 = 0.25;

// ── Logging ─────────────────────────────────────────────────────────────

/// Core `log` records reach the subscriber through its log bridge.
/// `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    init_logging(verbose);
    println!("=== LifeSim Simulation Harness ===\n");

    let demo: DemoFile = match serde_json::from_str(DEMO_WORLD_JSON) {
        Ok(d) => d,
        Err(e) => {
            println!("  ✗ demo_world_parse: JSON parse error: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. World layout
    results.extend(validate_world(&demo, verbose));

    // 2. Grid routes between every zone pair
    results.extend(validate_routes(&demo, verbose));

    // 3. Ten simulated minutes with the demo agents
    results.extend(validate_long_run(&demo, verbose));

    // 4. Death and respawn
    results.extend(validate_death_cycle(&demo, verbose));

    // 5. Player control and busy agents
    results.extend(validate_player_control(&demo, verbose));

    // 6. Save/load and determinism
    results.extend(validate_persistence(&demo, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn demo_engine(demo: &DemoFile) -> SimulationEngine {
    let mut engine = SimulationEngine::new(demo.config.clone());
    engine.set_world(demo.world.clone());
    for agent in &demo.agents {
        if let Err(e) = engine.spawn_agent(agent.spawn()) {
            println!("  ! could not spawn {}: {}", agent.id, e);
        }
    }
    engine
}

// ── 1. World ────────────────────────────────────────────────────────────

fn validate_world(demo: &DemoFile, verbose: bool) -> Vec<TestResult> {
    println!("--- World ---");
    let mut results = Vec::new();
    let world = &demo.world;

    results.push(TestResult {
        name: "world_has_zones".into(),
        passed: world.zones.len() >= 5,
        detail: format!("{} zones, {} obstacles", world.zones.len(), world.obstacles.len()),
    });

    let outside: Vec<_> = world
        .zones
        .iter()
        .filter(|z| !world.bounds.contains(&z.center()))
        .map(|z| z.id.to_string())
        .collect();
    results.push(TestResult {
        name: "zone_centers_in_bounds".into(),
        passed: outside.is_empty(),
        detail: if outside.is_empty() {
            "every zone center is inside the world".into()
        } else {
            format!("outside: {}", outside.join(", "))
        },
    });

    let mut ids: Vec<_> = world.zones.iter().map(|z| z.id.clone()).collect();
    ids.sort();
    ids.dedup();
    results.push(TestResult {
        name: "zone_ids_unique".into(),
        passed: ids.len() == world.zones.len(),
        detail: format!("{} distinct ids", ids.len()),
    });

    // Every need that can fall critical has somewhere to go
    let unserved: Vec<_> = NeedType::ALL
        .iter()
        .filter(|need| !world.zones.iter().any(|z| z.zone_type.serves(**need)))
        .map(|need| need.key())
        .collect();
    results.push(TestResult {
        name: "every_need_served".into(),
        passed: unserved.is_empty(),
        detail: if unserved.is_empty() {
            "all 7 needs have a restoring zone".into()
        } else {
            format!("unserved: {}", unserved.join(", "))
        },
    });

    let grid = ObstacleGrid::from_world(world, demo.config.locomotion.tile_size);
    let spawns_blocked = demo
        .config
        .vitals
        .spawn_points
        .iter()
        .filter(|p| grid.is_blocked(grid.cell_of(**p)))
        .count();
    results.push(TestResult {
        name: "spawn_points_walkable".into(),
        passed: spawns_blocked == 0,
        detail: format!(
            "{} spawn points, {} blocked",
            demo.config.vitals.spawn_points.len(),
            spawns_blocked
        ),
    });

    if verbose {
        println!(
            "  grid {}x{} tiles of {:.0}",
            grid.cols(),
            grid.rows(),
            grid.tile_size()
        );
    }
    results
}

// ── 2. Routes ───────────────────────────────────────────────────────────

fn validate_routes(demo: &DemoFile, verbose: bool) -> Vec<TestResult> {
    println!("--- Routes ---");
    let mut results = Vec::new();
    let config = &demo.config.locomotion;
    let grid = ObstacleGrid::from_world(&demo.world, config.tile_size);

    let mut failures = Vec::new();
    let mut pairs = 0;
    let mut longest = 0.0f32;
    for from in &demo.world.zones {
        for to in &demo.world.zones {
            if from.id == to.id {
                continue;
            }
            pairs += 1;
            let result = plan_path(&grid, from.center(), to.center(), config);
            let walkable = result
                .path
                .iter()
                .skip(1)
                .all(|p| !grid.is_blocked(grid.cell_of(*p)));
            if !result.success || !walkable {
                failures.push(format!("{}→{}", from.id, to.id));
            }
            longest = longest.max(result.length());
        }
    }
    results.push(TestResult {
        name: "routes_between_all_zones".into(),
        passed: failures.is_empty(),
        detail: if failures.is_empty() {
            format!("{} routes found, longest {:.0}", pairs, longest)
        } else {
            format!("no route: {}", failures.join(", "))
        },
    });

    // A route around the wall is never shorter than the straight line
    if let (Some(a), Some(b)) = (
        demo.world.zone(&ZoneId::from("cottage")),
        demo.world.zone(&ZoneId::from("clinic")),
    ) {
        let result = plan_path(&grid, a.center(), b.center(), config);
        let straight = a.center().distance(&b.center());
        results.push(TestResult {
            name: "detour_not_shorter_than_line".into(),
            passed: result.length() + 0.01 >= straight,
            detail: format!("route {:.0} vs straight {:.0}", result.length(), straight),
        });
    }

    if verbose {
        println!("  checked {} zone pairs", pairs);
    }
    results
}

// ── 3. Long run ─────────────────────────────────────────────────────────

fn validate_long_run(demo: &DemoFile, verbose: bool) -> Vec<TestResult> {
    println!("--- Long Run (10 min) ---");
    let mut results = Vec::new();
    let mut engine = demo_engine(demo);
    let max_queue = engine.config().decision.max_queue;

    let mut out_of_range = 0;
    let mut queue_overflow = 0;
    let mut arrivals = 0;
    let mut movements = 0;
    let mut deaths = 0;
    let steps = (600.0 / TICK) as usize;
    for _ in 0..steps {
        engine.update(TICK);
        for event in engine.drain_events() {
            match event {
                SimEvent::ArrivedAtZone { ref agent, ref zone } => {
                    arrivals += 1;
                    if verbose {
                        println!("  t={:>6.1} {} arrived at {}", engine.sim_time(), agent, zone);
                    }
                }
                SimEvent::MovementStarted { .. } => movements += 1,
                SimEvent::EntityDeath { .. } => deaths += 1,
                _ => {}
            }
        }
        for id in engine.agent_ids() {
            if let Some(needs) = engine.needs(&id) {
                if needs.iter().any(|(_, v)| !(0.0..=100.0).contains(&v)) {
                    out_of_range += 1;
                }
            }
            if let Some(state) = engine.decision_state(&id) {
                if state.goal_queue.len() > max_queue {
                    queue_overflow += 1;
                }
            }
        }
    }

    results.push(TestResult {
        name: "needs_stay_in_range".into(),
        passed: out_of_range == 0,
        detail: format!("{} out-of-range samples over {} ticks", out_of_range, steps),
    });
    results.push(TestResult {
        name: "goal_queue_bounded".into(),
        passed: queue_overflow == 0,
        detail: format!("{} overflows (max {})", queue_overflow, max_queue),
    });
    results.push(TestResult {
        name: "agents_travel".into(),
        passed: movements > 0 && arrivals > 0,
        detail: format!("{} departures, {} arrivals", movements, arrivals),
    });
    results.push(TestResult {
        name: "healthy_agents_survive".into(),
        passed: deaths == 0,
        detail: format!("{} deaths", deaths),
    });

    let hungry = AgentId::from("mara");
    let sources = engine
        .vitals(&hungry)
        .map(|v| v.satisfaction_sources.len())
        .unwrap_or(0);
    results.push(TestResult {
        name: "zones_credit_satisfaction".into(),
        passed: sources > 0,
        detail: format!("mara drew from {} zones", sources),
    });
    results
}

// ── 4. Death cycle ──────────────────────────────────────────────────────

fn validate_death_cycle(demo: &DemoFile, _verbose: bool) -> Vec<TestResult> {
    println!("--- Death & Respawn ---");
    let mut results = Vec::new();
    let mut engine = SimulationEngine::new(demo.config.clone());
    engine.set_world(demo.world.clone());

    let mut needs = Needs::uniform(70.0);
    needs.hunger = 9.0;
    needs.energy = 9.0;
    let id = AgentId::from("wren");
    let wren = AgentSpawn::new("wren", Vec2::new(480.0, 420.0)).with_needs(needs);
    if let Err(e) = engine.spawn_agent(wren) {
        results.push(TestResult {
            name: "death_spawn".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }

    engine.update(TICK);
    let died = engine
        .drain_events()
        .iter()
        .any(|e| matches!(e, SimEvent::EntityDeath { .. }));
    results.push(TestResult {
        name: "death_rule_fires".into(),
        passed: died && engine.vitals(&id).map(|v| v.is_dead).unwrap_or(false),
        detail: "hunger 9 + energy 9 → dead on first tick".into(),
    });

    let rejected = matches!(
        engine.move_to_zone(&id, &ZoneId::from("bakery")),
        Err(SimError::AgentDead(_))
    );
    results.push(TestResult {
        name: "dead_agents_stay_put".into(),
        passed: rejected,
        detail: "move_to_zone rejected while dead".into(),
    });

    let delay = demo.config.vitals.respawn_delay_secs;
    let mut respawned_at = None;
    for _ in 0..((delay / TICK) as usize + 4) {
        engine.update(TICK);
        for event in engine.drain_events() {
            if let SimEvent::EntityRespawn { position, .. } = event {
                respawned_at = Some(position);
            }
        }
    }
    let expected = engine.vitals_model().spawn_point(&id);
    results.push(TestResult {
        name: "respawn_after_delay".into(),
        passed: respawned_at == Some(expected),
        detail: format!("respawned at {:?}", respawned_at),
    });

    let band_ok = engine
        .needs(&id)
        .map(|n| n.hunger >= 80.0 && n.thirst >= 80.0 && n.energy >= 80.0)
        .unwrap_or(false);
    results.push(TestResult {
        name: "respawn_restores_needs".into(),
        passed: band_ok,
        detail: format!("{:?}", engine.needs(&id)),
    });
    results
}

// ── 5. Player control ───────────────────────────────────────────────────

fn validate_player_control(demo: &DemoFile, _verbose: bool) -> Vec<TestResult> {
    println!("--- Player Control ---");
    let mut results = Vec::new();
    let mut engine = demo_engine(demo);
    let id = AgentId::from("tobin");

    engine.update(TICK);
    engine.set_player_control(&id, true);
    let cleared = engine
        .decision_state(&id)
        .map(|s| s.current_goal.is_none() && s.goal_queue.is_empty())
        .unwrap_or(false);
    results.push(TestResult {
        name: "control_clears_goals".into(),
        passed: cleared,
        detail: "goal and queue emptied".into(),
    });

    // Let any movement started before the switch finish
    for _ in 0..((120.0 / TICK) as usize) {
        engine.update(TICK);
    }
    engine.drain_events();
    let quiet = (0..40).all(|_| {
        engine.update(TICK);
        !engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, SimEvent::MovementStarted { agent, .. } if agent == &id))
    });
    results.push(TestResult {
        name: "controlled_agent_waits".into(),
        passed: quiet,
        detail: "no autonomous departures".into(),
    });

    let first = engine.move_to_zone(&id, &ZoneId::from("market"));
    let second = engine.move_to_zone(&id, &ZoneId::from("plaza"));
    results.push(TestResult {
        name: "busy_agent_rejects_move".into(),
        passed: first.is_ok() && matches!(second, Err(SimError::AgentBusy { .. })),
        detail: format!(
            "first {:?}, second {:?}",
            first.map(|p| p.zone),
            second.map(|p| p.zone)
        ),
    });
    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(demo: &DemoFile, _verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();
    let mut engine = demo_engine(demo);
    for _ in 0..120 {
        engine.update(TICK);
    }

    let mut buf = Vec::new();
    if let Err(e) = engine.save(&mut buf) {
        results.push(TestResult {
            name: "save".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }

    let mut restored = SimulationEngine::new(demo.config.clone());
    restored.set_world(demo.world.clone());
    let loaded = restored.load(buf.as_slice());
    let same = loaded.is_ok()
        && engine.agent_ids() == restored.agent_ids()
        && engine
            .agent_ids()
            .iter()
            .all(|id| engine.snapshot_agent(id) == restored.snapshot_agent(id));
    results.push(TestResult {
        name: "save_load_round_trip".into(),
        passed: same,
        detail: format!("{} bytes, {} agents", buf.len(), restored.agent_count()),
    });

    let mut a = demo_engine(demo);
    let mut b = demo_engine(demo);
    let mut identical = true;
    for _ in 0..400 {
        a.update(TICK);
        b.update(TICK);
        if a.drain_events() != b.drain_events() {
            identical = false;
            break;
        }
    }
    results.push(TestResult {
        name: "seeded_runs_identical".into(),
        passed: identical,
        detail: format!("seed {:?}", demo.config.seed),
    });
    results
}
