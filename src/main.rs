//! Ram Arena headless runner
//!
//! Builds a seeded arena, drives the vehicle with a simple autopilot that
//! chases the nearest target, and logs what happens.
//!
//! Usage: `ram-arena [tuning.json] [seed]`

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use ram_arena::Tuning;
use ram_arena::consts::{MAX_SUBSTEPS, SIM_DT};
use ram_arena::sim::{Arena, ArenaEvent, DriveInput, FollowPoint, Hittable, Vehicle, tick};

/// Half width of the square arena
const ARENA_HALF: f32 = 40.0;
/// Simulated seconds before the run ends
const RUN_SECONDS: f32 = 60.0;
/// Render frame time the runner pretends to have
const FRAME_DT: f32 = 1.0 / 30.0;

struct Demo {
    arena: Arena,
    vehicle: Vehicle,
    accumulator: f32,
    kills: u32,
    launched: u32,
    destroyed: bool,
}

impl Demo {
    fn new(tuning: Tuning, seed: u64) -> Self {
        let mut arena = Arena::new(tuning);
        let mut rng = Pcg32::seed_from_u64(seed);

        // Perimeter walls
        let span = ARENA_HALF * 2.0;
        arena.spawn_wall(Vec3::new(0.0, 0.0, ARENA_HALF), Vec2::new(span, 1.0), 0.0);
        arena.spawn_wall(Vec3::new(0.0, 0.0, -ARENA_HALF), Vec2::new(span, 1.0), 0.0);
        arena.spawn_wall(Vec3::new(ARENA_HALF, 0.0, 0.0), Vec2::new(1.0, span), 0.0);
        arena.spawn_wall(Vec3::new(-ARENA_HALF, 0.0, 0.0), Vec2::new(1.0, span), 0.0);

        let inner = ARENA_HALF - 5.0;
        for _ in 0..8 {
            let center = random_point(&mut rng, inner);
            arena.spawn_pillar(center, rng.random_range(0.8..2.0));
        }
        for _ in 0..4 {
            let center = random_point(&mut rng, inner);
            let size = Vec2::new(rng.random_range(2.0..5.0), rng.random_range(2.0..5.0));
            let yaw = rng.random_range(0.0..std::f32::consts::TAU);
            arena.spawn_destructible(center, size, yaw, 40.0, true);
        }
        for _ in 0..12 {
            let position = random_point(&mut rng, inner);
            arena.spawn_creature(position);
        }
        for _ in 0..10 {
            let position = random_point(&mut rng, inner);
            arena.spawn_prop(position);
        }

        let vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        log::info!(
            "Arena ready: {} obstacles, {} targets (seed {seed})",
            arena.obstacles.len(),
            arena.targets.len()
        );

        Self {
            arena,
            vehicle,
            accumulator: 0.0,
            kills: 0,
            launched: 0,
            destroyed: false,
        }
    }

    /// Steer at whatever is closest and floor it
    fn autopilot(&self) -> DriveInput {
        let position = self.vehicle.state.position;
        let Some(target) = self
            .arena
            .targets
            .nearest_hittable(position)
            .and_then(|id| self.arena.targets.get(id))
        else {
            return DriveInput::default();
        };
        let to_target = target.collision_center() - position;
        DriveInput::toward(Vec2::new(to_target.x, to_target.z))
    }

    /// Run simulation ticks for one frame
    fn update(&mut self, frame_dt: f32) {
        let dt = frame_dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.autopilot();
            // Everyone converges on the vehicle
            let mut pursuit = FollowPoint(self.vehicle.collision_center());
            let report = tick(&mut self.arena, &mut self.vehicle, &input, &mut pursuit, SIM_DT);
            for event in report.events {
                self.record(event);
            }
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
    }

    /// Creatures currently chasing something, and the fastest prop in the air
    fn activity(&self) -> (usize, f32) {
        let chasing = self
            .arena
            .targets
            .iter()
            .filter_map(|t| t.as_creature())
            .filter(|c| c.pursuit_point().is_some())
            .count();
        let fastest = self
            .arena
            .targets
            .iter()
            .filter_map(|t| t.as_prop())
            .filter(|p| p.is_flying())
            .map(|p| p.velocity().length())
            .fold(0.0, f32::max);
        (chasing, fastest)
    }

    fn record(&mut self, event: ArenaEvent) {
        match event {
            ArenaEvent::CreatureKilled { .. } => self.kills += 1,
            ArenaEvent::PropLaunched { .. } => self.launched += 1,
            ArenaEvent::VehicleDestroyed { .. } => self.destroyed = true,
            ArenaEvent::ObstacleDestroyed { id } => log::info!("Smashed through {id}"),
            ArenaEvent::Despawned { .. } => {}
        }
    }
}

fn random_point(rng: &mut Pcg32, half: f32) -> Vec3 {
    // Keep the spawn point clear
    loop {
        let point = Vec3::new(rng.random_range(-half..half), 0.0, rng.random_range(-half..half));
        if point.length_squared() > 36.0 {
            return point;
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Ram Arena (headless) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => Tuning::load_or_default(path),
        None => Tuning::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    let mut demo = Demo::new(tuning, seed);
    let frames = (RUN_SECONDS / FRAME_DT) as u32;
    for frame in 0..frames {
        demo.update(FRAME_DT);
        if frame % 150 == 0 {
            let state = demo.vehicle.state();
            let health = demo
                .arena
                .router
                .health(demo.vehicle.id())
                .map_or(0.0, |h| h.current());
            let (chasing, fastest_prop) = demo.activity();
            log::info!(
                "t={:>5.1}s pos=({:>6.1}, {:>6.1}) v={:>5.1} hp={:>5.1} n={} hunting={} prop={:.1}",
                demo.arena.time(),
                state.position.x,
                state.position.z,
                state.speed,
                health,
                demo.arena.targets.len(),
                chasing,
                fastest_prop
            );
        }
        if demo.destroyed {
            log::info!("Vehicle destroyed after {:.1}s", demo.arena.time());
            break;
        }
    }

    println!(
        "Run finished: {} creatures killed, {} props launched, vehicle {}",
        demo.kills,
        demo.launched,
        if demo.destroyed { "destroyed" } else { "intact" }
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core is the library; there is no browser front end
}
