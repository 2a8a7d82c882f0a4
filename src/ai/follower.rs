//! Per-agent path following
//!
//! A `PathFollower` chases one target entity. Each tick it decides whether the
//! cached path is still good enough, replans when it is not, walks the path
//! waypoint by waypoint, and falls back to local steering (forced chases only)
//! when the grid offers no route.
//!
//! Replanning is rate limited: a countdown plus a goal-drift threshold keep
//! the number of searches bounded when many agents chase at once.

use std::sync::Arc;

use glam::Vec2;
use hecs::Entity;
use log::debug;
use serde::{Deserialize, Serialize};

use super::grid::{Cell, WalkabilityGrid};
use super::pathfinding::{Navigator, Path, PathFailure};
use super::steering::{MoveIntent, ObstacleSlide, SteeringBehavior};
use crate::ecs::World;

/// How hard the follower tries when no path exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChasePolicy {
    /// Stop when the target cannot be reached
    #[default]
    Normal,
    /// Keep pursuing: look for a reachable cell near the target, then steer
    /// directly at it when even that fails
    Forced,
}

/// Largest accepted `goal_fix_radius` or `forced_search_radius`
pub const MAX_SEARCH_RADIUS: u32 = 1024;

/// Tuning for path following
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerSettings {
    /// Seconds between scheduled replans
    pub replan_interval: f32,
    /// Goal drift (Manhattan cells) that triggers an early replan
    pub replan_cell_threshold: u32,
    /// Search budget per planner call
    pub max_expansions: u32,
    /// Distance at which a waypoint counts as reached
    pub waypoint_reach_distance: f32,
    /// Half-size of the window searched when the goal cell is blocked
    pub goal_fix_radius: u32,
    /// Ring radius of the forced reachable-cell search
    pub forced_search_radius: u32,
    /// Candidate cells the forced search may examine
    pub forced_search_samples: u32,
    /// Speed fraction used by local steering
    pub fallback_speed: f32,
    /// Agent collision radius for local steering
    pub agent_radius: f32,
    /// Local steering probe distance
    pub look_ahead: f32,
}

impl Default for FollowerSettings {
    fn default() -> Self {
        Self {
            replan_interval: 0.35,
            replan_cell_threshold: 2,
            max_expansions: 2500,
            waypoint_reach_distance: 0.08,
            goal_fix_radius: 4,
            forced_search_radius: 16,
            forced_search_samples: 120,
            fallback_speed: 1.0,
            agent_radius: 0.45,
            look_ahead: 0.6,
        }
    }
}

/// Planner work done by a follower since the last drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanReport {
    /// Planner calls, trial searches included
    pub searches: u32,
    /// Nodes closed across all calls
    pub expansions: u32,
    /// Calls that produced no path
    pub failures: u32,
}

impl PlanReport {
    fn record(&mut self, result: &Result<Path, PathFailure>) {
        self.searches += 1;
        match result {
            Ok(path) => self.expansions += path.expanded(),
            Err(failure) => {
                self.expansions += failure.expanded();
                self.failures += 1;
            }
        }
    }

    /// Add another report to this one
    pub fn merge(&mut self, other: PlanReport) {
        self.searches += other.searches;
        self.expansions += other.expansions;
        self.failures += other.failures;
    }
}

/// Nearest walkable substitute for a blocked cell.
///
/// Returns `cell` itself when walkable. Otherwise scans rings of growing
/// Manhattan distance, clipped to the square `|dx|, |dy| <= radius`, and
/// returns the first walkable cell in ring order (north first, clockwise).
#[must_use]
pub fn correct_goal(grid: &WalkabilityGrid, cell: Cell, radius: u32) -> Option<Cell> {
    if grid.is_walkable(cell) {
        return Some(cell);
    }

    (1..=radius.saturating_mul(2))
        .flat_map(|r| cell.ring(r))
        .filter(|candidate| candidate.chebyshev(cell) <= radius)
        .find(|&candidate| grid.is_walkable(candidate))
}

/// Drives one agent toward a target entity
#[derive(Debug)]
pub struct PathFollower {
    nav: Arc<Navigator>,
    settings: FollowerSettings,
    target: Option<Entity>,
    policy: ChasePolicy,
    last_goal: Cell,
    /// Seconds until the next scheduled replan
    replan_timer: f32,
    path: Vec<Cell>,
    /// Index of the last waypoint reached
    waypoint: usize,
    /// The path starts on a corrected cell the agent has not reached yet
    pending_start: bool,
    report: PlanReport,
}

impl PathFollower {
    /// Create an idle follower
    #[must_use]
    pub fn new(nav: Arc<Navigator>, settings: FollowerSettings) -> Self {
        Self {
            nav,
            settings,
            target: None,
            policy: ChasePolicy::Normal,
            last_goal: Cell::default(),
            replan_timer: 0.0,
            path: Vec::new(),
            waypoint: 0,
            pending_start: false,
            report: PlanReport::default(),
        }
    }

    /// Start chasing `target` with the normal policy.
    ///
    /// Returns false (and changes nothing) if the target has no position in
    /// `world`.
    pub fn set_target(&mut self, target: Entity, world: &World) -> bool {
        self.track(target, world, ChasePolicy::Normal)
    }

    /// Start chasing `target` with the forced policy.
    ///
    /// Returns false (and changes nothing) if the target has no position in
    /// `world`.
    pub fn force_chase(&mut self, target: Entity, world: &World) -> bool {
        self.track(target, world, ChasePolicy::Forced)
    }

    /// Stop chasing and drop the cached path
    pub fn clear_target(&mut self) -> MoveIntent {
        self.target = None;
        self.policy = ChasePolicy::Normal;
        self.clear_path();
        MoveIntent::STOP
    }

    /// Entity being chased
    #[must_use]
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    /// Current policy
    #[must_use]
    pub fn policy(&self) -> ChasePolicy {
        self.policy
    }

    /// Cached path, if any
    #[must_use]
    pub fn path(&self) -> Option<&[Cell]> {
        (!self.path.is_empty()).then_some(self.path.as_slice())
    }

    /// Check if a path is cached
    #[must_use]
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Index of the last waypoint reached on the cached path
    #[must_use]
    pub fn waypoint_index(&self) -> usize {
        self.waypoint
    }

    /// Settings in use
    #[must_use]
    pub fn settings(&self) -> &FollowerSettings {
        &self.settings
    }

    /// Take the planner work recorded since the last call
    pub fn take_report(&mut self) -> PlanReport {
        std::mem::take(&mut self.report)
    }

    /// Advance one tick and return the movement intent for the agent
    pub fn tick(&mut self, world: &World, position: Vec2, delta_time: f32) -> MoveIntent {
        let Some(target) = self.target else {
            self.clear_path();
            return MoveIntent::STOP;
        };

        let Some(target_position) = world.position(target) else {
            debug!("Chase target {target:?} no longer exists, dropping it");
            return self.clear_target();
        };

        let nav = Arc::clone(&self.nav);
        let grid = nav.grid();
        let radius = self.settings.goal_fix_radius;

        let raw_goal = grid.world_to_cell(target_position);
        let Some(goal) = correct_goal(grid, raw_goal, radius) else {
            return self.fallback(position, target_position);
        };

        let agent_cell = grid.world_to_cell(position);
        let start = correct_goal(grid, agent_cell, radius).unwrap_or(agent_cell);

        self.replan_timer -= delta_time;
        let drifted = goal.manhattan(self.last_goal) >= self.settings.replan_cell_threshold;

        if self.replan_timer <= 0.0 || drifted {
            self.replan_timer = self.settings.replan_interval;
            self.last_goal = goal;

            if !self.replan(start, goal, raw_goal) {
                return self.fallback(position, target_position);
            }
            self.pending_start = start != agent_cell;
        }

        self.follow_path(position, target_position)
    }

    fn track(&mut self, target: Entity, world: &World, policy: ChasePolicy) -> bool {
        let Some(position) = world.position(target) else {
            debug!("Ignoring chase request for missing target {target:?}");
            return false;
        };

        if self.policy != policy {
            debug!("Chase policy {:?} -> {policy:?}", self.policy);
        }

        self.target = Some(target);
        self.policy = policy;
        self.last_goal = self.nav.grid().world_to_cell(position);
        self.replan_timer = 0.0;
        self.clear_path();
        true
    }

    /// Plan to `goal`; in forced mode settle for a reachable cell near the
    /// raw target cell. Returns whether a path is now cached.
    fn replan(&mut self, start: Cell, goal: Cell, raw_goal: Cell) -> bool {
        let result = self
            .nav
            .planner()
            .find_path(start, goal, self.settings.max_expansions);
        self.report.record(&result);

        match result {
            Ok(path) => {
                self.adopt(path);
                true
            }
            Err(failure) => {
                debug!("Replan {start} -> {goal} failed: {failure}");
                self.clear_path();

                if self.policy == ChasePolicy::Forced
                    && let Some(path) = self.find_reachable_near(start, raw_goal)
                {
                    debug!("Forced chase settling for {:?}", path.goal());
                    self.adopt(path);
                    return true;
                }

                false
            }
        }
    }

    /// Ring search around `target_cell` for the nearest cell with a path from
    /// `start`. Each candidate costs a trial search, so the number examined is
    /// capped by `forced_search_samples`.
    fn find_reachable_near(&mut self, start: Cell, target_cell: Cell) -> Option<Path> {
        let nav = Arc::clone(&self.nav);
        let mut checked = 0;

        for radius in 1..=self.settings.forced_search_radius {
            for candidate in target_cell.ring(radius) {
                if checked >= self.settings.forced_search_samples {
                    return None;
                }
                checked += 1;

                if !nav.grid().is_walkable(candidate) {
                    continue;
                }

                let result =
                    nav.planner()
                        .find_path(start, candidate, self.settings.max_expansions);
                self.report.record(&result);

                if let Ok(path) = result {
                    return Some(path);
                }
            }
        }

        None
    }

    fn adopt(&mut self, path: Path) {
        self.path.clear();
        self.path.extend_from_slice(path.cells());
        self.waypoint = 0;
        self.pending_start = false;
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.waypoint = 0;
        self.pending_start = false;
    }

    fn follow_path(&mut self, position: Vec2, target_position: Vec2) -> MoveIntent {
        if self.path.is_empty() {
            return self.fallback(position, target_position);
        }

        let last = self.path.len() - 1;

        loop {
            let next = if self.pending_start {
                self.waypoint
            } else {
                (self.waypoint + 1).min(last)
            };
            let to_waypoint = self.nav.grid().cell_to_world_center(self.path[next]) - position;

            if to_waypoint.length() > self.settings.waypoint_reach_distance {
                return MoveIntent::new(to_waypoint, 1.0);
            }

            if self.pending_start {
                // Back on the grid; aim along the path from here
                self.pending_start = false;
                continue;
            }

            self.waypoint = next;

            if self.waypoint >= last {
                // End of the path: replan on the next tick
                self.replan_timer = 0.0;
                return match self.policy {
                    ChasePolicy::Forced => self.steer_toward(position, target_position),
                    ChasePolicy::Normal => MoveIntent::STOP,
                };
            }
        }
    }

    fn fallback(&self, position: Vec2, target_position: Vec2) -> MoveIntent {
        match self.policy {
            ChasePolicy::Forced => self.steer_toward(position, target_position),
            ChasePolicy::Normal => MoveIntent::STOP,
        }
    }

    fn steer_toward(&self, position: Vec2, target_position: Vec2) -> MoveIntent {
        ObstacleSlide {
            target: target_position,
            agent_radius: self.settings.agent_radius,
            look_ahead: self.settings.look_ahead,
            speed: self.settings.fallback_speed,
            geometry: self.nav.geometry(),
        }
        .calculate(position)
    }
}
