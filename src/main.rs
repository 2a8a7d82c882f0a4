//! Headless demo: three chasers hunting a target around a walled level
//!
//! Usage: `pursuit-nav [config.ron|config.json]`

use std::sync::Arc;

use pursuit_nav::ai::CellBounds;
use pursuit_nav::hecs::Entity;
use pursuit_nav::prelude::*;

const LEVEL: &[&str] = &[
    "##########################",
    "#............#...........#",
    "#............#...........#",
    "#....####....#....####...#",
    "#....#.......#.......#...#",
    "#....#...............#...#",
    "#....#######...#######...#",
    "#........................#",
    "#..........#####.........#",
    "#..........#...#.........#",
    "#........................#",
    "##########################",
];

/// Loop walked by the target
const TARGET_ROUTE: [Vec2; 4] = [
    Vec2::new(2.5, 4.5),
    Vec2::new(23.5, 4.5),
    Vec2::new(23.5, 1.5),
    Vec2::new(2.5, 1.5),
];

const TARGET_SPEED: f32 = 2.5;
const CHASER_SPEED: f32 = 3.0;
const CATCH_DISTANCE: f32 = 0.6;
const LOG_EVERY: u64 = 50;

struct Agent {
    entity: Entity,
    brain: Chaser,
    caught: bool,
}

struct PursuitDemo {
    nav: Arc<Navigator>,
    config: NavConfig,
    target: Option<Entity>,
    route_index: usize,
    agents: Vec<Agent>,
}

impl PursuitDemo {
    fn new(nav: Arc<Navigator>, config: NavConfig) -> Self {
        Self {
            nav,
            config,
            target: None,
            route_index: 0,
            agents: Vec::new(),
        }
    }

    fn spawn_chaser(&mut self, ctx: &mut EngineContext, name: &str, at: Vec2, seed: u64) {
        let entity = ctx.world.spawn((
            Position(at),
            Velocity::default(),
            MoveSpeed(CHASER_SPEED),
            Name::new(name),
        ));
        let brain = Chaser::new(
            Arc::clone(&self.nav),
            self.config.follower,
            self.config.chaser,
            seed,
        );
        self.agents.push(Agent {
            entity,
            brain,
            caught: false,
        });
    }

    fn move_target(&mut self, world: &mut World, dt: f32) {
        let Some(target) = self.target else {
            return;
        };
        let Some(position) = world.position(target) else {
            return;
        };

        let waypoint = TARGET_ROUTE[self.route_index];
        let to_waypoint = waypoint - position;
        let step = TARGET_SPEED * dt;

        let next = if to_waypoint.length() <= step {
            self.route_index = (self.route_index + 1) % TARGET_ROUTE.len();
            waypoint
        } else {
            position + to_waypoint.normalize() * step
        };
        world.set_position(target, next);
    }
}

/// Apply a move, sliding along walls on a blocked axis
fn integrate(geometry: &dyn LevelGeometry, position: Vec2, motion: Vec2, radius: f32) -> Vec2 {
    let half_extents = Vec2::splat(radius);
    let free = |p: Vec2| !geometry.overlaps_box(p, half_extents);

    [
        position + motion,
        position + Vec2::new(motion.x, 0.0),
        position + Vec2::new(0.0, motion.y),
    ]
    .into_iter()
    .find(|&candidate| free(candidate))
    .unwrap_or(position)
}

impl Game for PursuitDemo {
    fn init(&mut self, ctx: &mut EngineContext) {
        log::info!("Initializing pursuit demo");

        let target = ctx
            .world
            .spawn((Position(TARGET_ROUTE[0]), Name::new("target")));
        self.target = Some(target);

        self.spawn_chaser(ctx, "hound", Vec2::new(2.5, 10.5), 1);
        self.spawn_chaser(ctx, "stalker", Vec2::new(18.5, 10.5), 2);
        self.spawn_chaser(ctx, "tracker", Vec2::new(8.5, 7.5), 3);

        // The tracker ignores detection ranges and never gives up
        if let Some(tracker) = self.agents.last_mut()
            && !tracker.brain.force_chase(target, &ctx.world)
        {
            log::warn!("Could not force chase on {target:?}");
        }

        ctx.debug.enabled = true;
        log::info!("Pursuit demo initialized with {} chasers", self.agents.len());
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        let dt = ctx.time.delta_seconds();
        self.move_target(&mut ctx.world, dt);

        let candidates: Vec<Entity> = self.target.into_iter().collect();
        let radius = self.config.follower.agent_radius;
        let mut report = pursuit_nav::ai::PlanReport::default();

        for agent in &mut self.agents {
            let Some(position) = ctx.world.position(agent.entity) else {
                continue;
            };

            let intent = agent.brain.update(&ctx.world, position, &candidates, dt);
            report.merge(agent.brain.take_report());

            let speed = ctx
                .world
                .get::<MoveSpeed>(agent.entity)
                .map(|speed| speed.0)
                .unwrap_or(CHASER_SPEED);
            let velocity = intent.velocity(speed);
            let next = integrate(self.nav.geometry(), position, velocity * dt, radius);

            ctx.world.set_position(agent.entity, next);
            if let Ok(mut current) = ctx.world.inner.get::<&mut Velocity>(agent.entity) {
                current.0 = velocity;
            }

            let target_position = self.target.and_then(|t| ctx.world.position(t));
            let close = target_position.is_some_and(|t| t.distance(next) <= CATCH_DISTANCE);
            if close && !agent.caught {
                log::info!(
                    "{} reached the target at {:.1}s",
                    agent_name(&ctx.world, agent.entity),
                    ctx.time.elapsed_seconds()
                );
            }
            agent.caught = close;
        }

        ctx.debug.record_tick(report);

        if ctx.debug.enabled && ctx.time.tick_count() % LOG_EVERY == 0 {
            for agent in &self.agents {
                let position = ctx.world.position(agent.entity).unwrap_or_default();
                log::info!(
                    "{:>8} {:>6} {:?} at ({:.1}, {:.1})",
                    agent_name(&ctx.world, agent.entity),
                    agent.brain.state_name(),
                    agent.brain.follower().policy(),
                    position.x,
                    position.y
                );
            }
            log::info!("{}", ctx.debug.planner_stats.format_stats());
        }
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        for line in ctx.debug.get_all_lines() {
            log::info!("{line}");
        }
        let totals = ctx.debug.planner_stats.totals();
        log::info!(
            "Planner totals: {} searches, {} expansions, {} failures",
            totals.searches,
            totals.expansions,
            totals.failures
        );
    }
}

fn agent_name(world: &World, entity: Entity) -> String {
    world
        .get::<Name>(entity)
        .map(|name| name.0.clone())
        .unwrap_or_else(|_| format!("{entity:?}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => NavConfig::load(path)?,
        None => NavConfig::default(),
    };

    let geometry = Arc::new(StaticGeometry::from_ascii(LEVEL, Vec2::ZERO, 1.0));

    let cell_size = config.grid.cell_size;
    let width = LEVEL.iter().map(|row| row.len()).max().unwrap_or(0) as f32;
    let height = LEVEL.len() as f32;
    let settings = GridSettings {
        origin: Vec2::ZERO,
        bounds: CellBounds::new(
            Cell::new(0, 0),
            (width / cell_size).ceil() as u32,
            (height / cell_size).ceil() as u32,
        ),
        ..config.grid
    };
    let nav = Navigator::build(&settings, geometry)?;

    let engine_config = EngineConfig::default()
        .with_title("Pursuit Demo")
        .with_tick_rate(50)
        .with_max_ticks(1500);

    Engine::new(engine_config, PursuitDemo::new(nav, config)).run()
}
