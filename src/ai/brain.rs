//! Chaser brain: patrol until something comes close, then chase it
//!
//! Couples a [`StateMachine`] with a [`PathFollower`]. The states only see
//! an owned [`ChaserContext`]; they post commands on it and the brain applies
//! them to the follower after each update.

use std::sync::Arc;

use glam::Vec2;
use hecs::Entity;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::follower::{FollowerSettings, PathFollower, PlanReport};
use super::fsm::{State, StateMachine, Transition};
use super::pathfinding::Navigator;
use super::steering::{MoveIntent, SteeringBehavior, Wander, WanderSettings};
use crate::ecs::World;

/// Detection ranges and idle behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaserSettings {
    /// Start chasing a candidate closer than this
    pub detect_range: f32,
    /// Give up a normal chase once the closest candidate is farther than this
    pub lost_range: f32,
    /// Wandering while patrolling
    pub wander: WanderSettings,
}

impl Default for ChaserSettings {
    fn default() -> Self {
        Self {
            detect_range: 12.0,
            lost_range: 18.0,
            wander: WanderSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Chase(Entity),
    Release,
}

/// Per-tick inputs and outputs shared with the states
#[derive(Debug)]
pub struct ChaserContext {
    settings: ChaserSettings,
    rng: StdRng,
    delta_time: f32,
    position: Vec2,
    /// Closest live candidate and its distance
    nearest: Option<(Entity, f32)>,
    /// Distance to the followed target, `None` once it is gone
    target_distance: Option<f32>,
    forced: bool,
    command: Option<Command>,
    wander_intent: MoveIntent,
}

#[derive(Debug)]
struct PatrolState {
    wander: Wander,
}

impl PatrolState {
    fn new(settings: WanderSettings) -> Self {
        Self {
            wander: Wander::new(settings),
        }
    }
}

impl State<ChaserContext> for PatrolState {
    fn name(&self) -> &'static str {
        "Patrol"
    }

    fn enter(&mut self, ctx: &mut ChaserContext) {
        self.wander.reset();
        ctx.command = Some(Command::Release);
    }

    fn update(&mut self, ctx: &mut ChaserContext) -> Transition<ChaserContext> {
        if let Some((entity, distance)) = ctx.nearest
            && distance <= ctx.settings.detect_range
        {
            return Transition::to(ChaseState { target: entity });
        }

        self.wander.update(ctx.delta_time, &mut ctx.rng);
        ctx.wander_intent = self.wander.calculate(ctx.position);
        Transition::None
    }
}

#[derive(Debug)]
struct ChaseState {
    target: Entity,
}

impl State<ChaserContext> for ChaseState {
    fn name(&self) -> &'static str {
        "Chase"
    }

    fn enter(&mut self, ctx: &mut ChaserContext) {
        ctx.command = Some(Command::Chase(self.target));
    }

    fn update(&mut self, ctx: &mut ChaserContext) -> Transition<ChaserContext> {
        if ctx.target_distance.is_none() {
            return Transition::to(PatrolState::new(ctx.settings.wander));
        }
        if ctx.forced {
            return Transition::None;
        }

        // A normal chase always follows the closest candidate
        match ctx.nearest {
            Some((entity, distance)) if distance <= ctx.settings.lost_range => {
                if entity != self.target {
                    debug!("Retargeting from {:?} to closer {entity:?}", self.target);
                    self.target = entity;
                    ctx.command = Some(Command::Chase(entity));
                }
                Transition::None
            }
            _ => Transition::to(PatrolState::new(ctx.settings.wander)),
        }
    }

    fn exit(&mut self, ctx: &mut ChaserContext) {
        ctx.command = Some(Command::Release);
    }
}

/// Autonomous pursuer
#[derive(Debug)]
pub struct Chaser {
    follower: PathFollower,
    fsm: StateMachine<ChaserContext>,
    ctx: ChaserContext,
}

impl Chaser {
    /// Create a patrolling chaser; `seed` makes its wandering reproducible
    #[must_use]
    pub fn new(
        nav: Arc<Navigator>,
        follower: FollowerSettings,
        settings: ChaserSettings,
        seed: u64,
    ) -> Self {
        Self {
            follower: PathFollower::new(nav, follower),
            fsm: StateMachine::new(PatrolState::new(settings.wander)),
            ctx: ChaserContext {
                settings,
                rng: StdRng::seed_from_u64(seed),
                delta_time: 0.0,
                position: Vec2::ZERO,
                nearest: None,
                target_distance: None,
                forced: false,
                command: None,
                wander_intent: MoveIntent::STOP,
            },
        }
    }

    /// Pin `target` with the forced policy until it dies.
    ///
    /// Detection ranges are ignored while forced. Returns false if the target
    /// has no position.
    pub fn force_chase(&mut self, target: Entity, world: &World) -> bool {
        if !self.follower.force_chase(target, world) {
            return false;
        }

        info!("Forcing chase of {target:?}");
        self.ctx.forced = true;
        self.fsm.transition(&mut self.ctx, ChaseState { target });
        self.apply_command(world);
        true
    }

    /// Whether a forced chase is active
    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.ctx.forced
    }

    /// Name of the current behavior state
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.fsm.current_state_name()
    }

    /// The underlying path follower
    #[must_use]
    pub fn follower(&self) -> &PathFollower {
        &self.follower
    }

    /// Take the planner work recorded since the last call
    pub fn take_report(&mut self) -> PlanReport {
        self.follower.take_report()
    }

    /// Advance one tick.
    ///
    /// `candidates` are the entities this chaser may pick up; dead ones are
    /// skipped.
    pub fn update(
        &mut self,
        world: &World,
        position: Vec2,
        candidates: &[Entity],
        delta_time: f32,
    ) -> MoveIntent {
        self.ctx.delta_time = delta_time;
        self.ctx.position = position;
        self.ctx.target_distance = self
            .follower
            .target()
            .and_then(|target| world.position(target))
            .map(|target| target.distance(position));

        if self.ctx.forced && self.ctx.target_distance.is_none() {
            debug!("Forced target gone, cancelling forced chase");
            self.ctx.forced = false;
        }

        self.ctx.nearest = candidates
            .iter()
            .filter_map(|&entity| Some((entity, world.position(entity)?.distance(position))))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        self.fsm.update(&mut self.ctx);
        self.apply_command(world);

        if self.fsm.is_in_state("Chase") {
            self.follower.tick(world, position, delta_time)
        } else {
            self.ctx.wander_intent
        }
    }

    fn apply_command(&mut self, world: &World) {
        match self.ctx.command.take() {
            Some(Command::Chase(target)) => {
                if self.follower.target() != Some(target) {
                    self.follower.set_target(target, world);
                }
            }
            Some(Command::Release) => {
                self.ctx.forced = false;
                self.follower.clear_target();
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::WalkabilityGrid;
    use crate::ecs::Position;
    use crate::physics::StaticGeometry;

    const DT: f32 = 0.02;

    fn open_navigator() -> Arc<Navigator> {
        let row = ".".repeat(40);
        let rows = [row.as_str(), row.as_str(), row.as_str()];
        let grid = WalkabilityGrid::from_ascii(&rows, Vec2::ZERO, 1.0).unwrap();
        Navigator::new(grid, Arc::new(StaticGeometry::new()))
    }

    fn chaser(seed: u64) -> Chaser {
        Chaser::new(
            open_navigator(),
            FollowerSettings::default(),
            ChaserSettings::default(),
            seed,
        )
    }

    #[test]
    fn test_patrol_ignores_distant_candidates() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let far = world.spawn((Position(Vec2::new(35.5, 1.5)),));

        chaser.update(&world, Vec2::new(1.5, 1.5), &[far], DT);

        assert_eq!(chaser.state_name(), "Patrol");
        assert_eq!(chaser.follower().target(), None);
    }

    #[test]
    fn test_detects_and_chases_nearest() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let near = world.spawn((Position(Vec2::new(6.5, 1.5)),));
        let nearer = world.spawn((Position(Vec2::new(4.5, 1.5)),));

        let intent = chaser.update(&world, Vec2::new(1.5, 1.5), &[near, nearer], DT);

        assert_eq!(chaser.state_name(), "Chase");
        assert_eq!(chaser.follower().target(), Some(nearer));
        assert!(intent.direction.x > 0.9);
        assert_eq!(chaser.take_report().searches, 1);
    }

    #[test]
    fn test_gives_up_beyond_lost_range() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let target = world.spawn((Position(Vec2::new(6.5, 1.5)),));
        let position = Vec2::new(1.5, 1.5);

        chaser.update(&world, position, &[target], DT);
        assert_eq!(chaser.state_name(), "Chase");

        // Between the two ranges the chase holds
        world.set_position(target, Vec2::new(16.5, 1.5));
        chaser.update(&world, position, &[target], DT);
        assert_eq!(chaser.state_name(), "Chase");

        world.set_position(target, Vec2::new(25.5, 1.5));
        chaser.update(&world, position, &[], DT);
        assert_eq!(chaser.state_name(), "Patrol");
        assert_eq!(chaser.follower().target(), None);
    }

    #[test]
    fn test_forced_chase_ignores_range_until_target_dies() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let target = world.spawn((Position(Vec2::new(30.5, 1.5)),));
        let position = Vec2::new(1.5, 1.5);

        assert!(chaser.force_chase(target, &world));
        assert!(chaser.is_forced());
        assert_eq!(chaser.state_name(), "Chase");

        let intent = chaser.update(&world, position, &[], DT);
        assert_eq!(chaser.state_name(), "Chase");
        assert!(!intent.is_stop());

        world.despawn(target).unwrap();
        let intent = chaser.update(&world, position, &[], DT);

        assert!(!chaser.is_forced());
        assert_eq!(chaser.state_name(), "Patrol");
        assert_eq!(chaser.follower().target(), None);
        assert!(intent.is_stop());
    }

    #[test]
    fn test_force_chase_rejects_missing_target() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let target = world.spawn((Position(Vec2::ONE),));
        world.despawn(target).unwrap();

        assert!(!chaser.force_chase(target, &world));
        assert!(!chaser.is_forced());
        assert_eq!(chaser.state_name(), "Patrol");
    }

    #[test]
    fn test_patrol_is_seeded() {
        let world = World::new();
        let mut a = chaser(42);
        let mut b = chaser(42);

        for _ in 0..200 {
            let position = Vec2::new(10.5, 1.5);
            assert_eq!(
                a.update(&world, position, &[], DT),
                b.update(&world, position, &[], DT)
            );
        }
    }

    #[test]
    fn test_retargets_to_closer_candidate() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let first = world.spawn((Position(Vec2::new(10.5, 1.5)),));
        let second = world.spawn((Position(Vec2::new(35.5, 1.5)),));
        let position = Vec2::new(1.5, 1.5);

        chaser.update(&world, position, &[first, second], DT);
        assert_eq!(chaser.follower().target(), Some(first));

        // The second closes in while the first backs off, still within lost range
        world.set_position(second, Vec2::new(2.5, 1.5));
        world.set_position(first, Vec2::new(17.5, 1.5));
        let intent = chaser.update(&world, position, &[first, second], DT);

        assert_eq!(chaser.state_name(), "Chase");
        assert_eq!(chaser.follower().target(), Some(second));
        assert!(intent.direction.x > 0.9);
    }

    #[test]
    fn test_forced_chase_keeps_its_target() {
        let mut chaser = chaser(1);
        let mut world = World::new();
        let pinned = world.spawn((Position(Vec2::new(30.5, 1.5)),));
        let bystander = world.spawn((Position(Vec2::new(2.5, 1.5)),));

        assert!(chaser.force_chase(pinned, &world));
        chaser.update(&world, Vec2::new(1.5, 1.5), &[pinned, bystander], DT);

        assert_eq!(chaser.follower().target(), Some(pinned));
        assert!(chaser.is_forced());
    }
}
