//! A* pathfinding on the walkability grid
//!
//! 8-connected search with octile costs (10 orthogonal, 14 diagonal), no
//! corner cutting, and a hard cap on the number of closed nodes so a single
//! search can never stall a tick.

use std::fmt;
use std::sync::Arc;

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::grid::{Cell, GridError, GridSettings, WalkabilityGrid};
use super::heap::MinHeap;
use crate::physics::LevelGeometry;

/// Cost of an orthogonal step
pub const STRAIGHT_COST: u32 = 10;
/// Cost of a diagonal step (10 * sqrt(2), rounded)
pub const DIAGONAL_COST: u32 = 14;

/// Neighbour offsets: orthogonal first, then diagonal
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Octile distance between two cells.
///
/// Exact on an unobstructed grid and never overestimates otherwise.
#[must_use]
pub fn octile_distance(a: Cell, b: Cell) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    let diagonal = dx.min(dy);
    let straight = dx.max(dy) - diagonal;
    DIAGONAL_COST * diagonal + STRAIGHT_COST * straight
}

/// Cost of a single step between adjacent cells
#[must_use]
pub fn step_cost(from: Cell, to: Cell) -> u32 {
    if from.x != to.x && from.y != to.y {
        DIAGONAL_COST
    } else {
        STRAIGHT_COST
    }
}

/// A successful search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    cells: Vec<Cell>,
    cost: u32,
    expanded: u32,
}

impl Path {
    /// Cells from start to goal, both inclusive
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Total step cost
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Number of nodes the search closed before reaching the goal
    #[must_use]
    pub fn expanded(&self) -> u32 {
        self.expanded
    }

    /// Number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false for a path produced by the planner
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First cell
    #[must_use]
    pub fn start(&self) -> Option<Cell> {
        self.cells.first().copied()
    }

    /// Last cell
    #[must_use]
    pub fn goal(&self) -> Option<Cell> {
        self.cells.last().copied()
    }
}

/// Why a search did not produce a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFailure {
    /// Start cell is blocked or out of bounds
    StartBlocked,
    /// Goal cell is blocked or out of bounds
    GoalBlocked,
    /// Every reachable cell was closed without reaching the goal
    Exhausted { expanded: u32 },
    /// Closed more nodes than allowed
    BudgetExceeded { expanded: u32 },
}

impl PathFailure {
    /// Nodes closed before giving up
    #[must_use]
    pub fn expanded(&self) -> u32 {
        match self {
            Self::StartBlocked | Self::GoalBlocked => 0,
            Self::Exhausted { expanded } | Self::BudgetExceeded { expanded } => *expanded,
        }
    }
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartBlocked => write!(f, "start cell is not walkable"),
            Self::GoalBlocked => write!(f, "goal cell is not walkable"),
            Self::Exhausted { expanded } => {
                write!(f, "goal unreachable ({expanded} nodes expanded)")
            }
            Self::BudgetExceeded { expanded } => {
                write!(f, "expansion budget exceeded after {expanded} nodes")
            }
        }
    }
}

impl std::error::Error for PathFailure {}

/// Stateless A* search over a shared grid
#[derive(Debug, Clone)]
pub struct PathPlanner {
    grid: Arc<WalkabilityGrid>,
}

impl PathPlanner {
    /// Create a planner over `grid`
    #[must_use]
    pub fn new(grid: Arc<WalkabilityGrid>) -> Self {
        Self { grid }
    }

    /// The grid searched
    #[must_use]
    pub fn grid(&self) -> &WalkabilityGrid {
        &self.grid
    }

    /// Find the cheapest path from `start` to `goal`.
    ///
    /// Gives up once more than `max_expansions` non-goal nodes have been
    /// closed. Identical arguments always produce identical paths.
    ///
    /// # Errors
    ///
    /// Returns why no path was produced; failures are routine, not bugs
    pub fn find_path(&self, start: Cell, goal: Cell, max_expansions: u32) -> Result<Path, PathFailure> {
        let grid = &*self.grid;

        if !grid.is_walkable(start) {
            return Err(PathFailure::StartBlocked);
        }
        if !grid.is_walkable(goal) {
            return Err(PathFailure::GoalBlocked);
        }

        let mut open: MinHeap<Cell> = MinHeap::with_capacity(64);
        let mut closed: FxHashSet<Cell> = FxHashSet::default();
        let mut came_from: FxHashMap<Cell, Cell> = FxHashMap::default();
        let mut g_score: FxHashMap<Cell, u32> = FxHashMap::default();

        g_score.insert(start, 0);
        open.push(start, octile_distance(start, goal));

        let mut expanded = 0;

        while let Some(current) = open.pop() {
            // Stale duplicate of an already-finalised cell
            if !closed.insert(current) {
                continue;
            }

            if current == goal {
                let cells = reconstruct_path(&came_from, goal);
                let cost = g_score.get(&goal).copied().unwrap_or_default();
                trace!("Path {start} -> {goal}: {} cells, cost {cost}", cells.len());
                return Ok(Path {
                    cells,
                    cost,
                    expanded,
                });
            }

            expanded += 1;
            if expanded > max_expansions {
                trace!("Search {start} -> {goal} hit budget of {max_expansions}");
                return Err(PathFailure::BudgetExceeded { expanded });
            }

            let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);

            for next in walkable_neighbors(grid, current) {
                if closed.contains(&next) {
                    continue;
                }

                let tentative_g = current_g.saturating_add(step_cost(current, next));
                if g_score.get(&next).is_some_and(|&old| tentative_g >= old) {
                    continue;
                }

                came_from.insert(next, current);
                g_score.insert(next, tentative_g);
                open.push(next, tentative_g + octile_distance(next, goal));
            }
        }

        Err(PathFailure::Exhausted { expanded })
    }
}

/// Walkable neighbours of `cell`, refusing diagonals that clip a blocked corner
fn walkable_neighbors(grid: &WalkabilityGrid, cell: Cell) -> SmallVec<[Cell; 8]> {
    DIRECTIONS
        .iter()
        .filter(|&&(dx, dy)| {
            dx == 0
                || dy == 0
                || (grid.is_walkable(cell.offset(dx, 0)) && grid.is_walkable(cell.offset(0, dy)))
        })
        .map(|&(dx, dy)| cell.offset(dx, dy))
        .filter(|&next| grid.is_walkable(next))
        .collect()
}

fn reconstruct_path(came_from: &FxHashMap<Cell, Cell>, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

/// Grid, planner and level geometry bundled for sharing between agents.
///
/// Built once per level and handed to every follower as `Arc<Navigator>`.
pub struct Navigator {
    grid: Arc<WalkabilityGrid>,
    planner: PathPlanner,
    geometry: Arc<dyn LevelGeometry>,
}

impl Navigator {
    /// Build the grid from `geometry` and wrap everything up
    ///
    /// # Errors
    ///
    /// Returns an error if the grid settings are degenerate
    pub fn build(
        settings: &GridSettings,
        geometry: Arc<dyn LevelGeometry>,
    ) -> Result<Arc<Self>, GridError> {
        let grid = WalkabilityGrid::build(settings, geometry.as_ref())?;
        Ok(Self::new(grid, geometry))
    }

    /// Wrap an already built grid
    #[must_use]
    pub fn new(grid: WalkabilityGrid, geometry: Arc<dyn LevelGeometry>) -> Arc<Self> {
        let grid = Arc::new(grid);
        Arc::new(Self {
            planner: PathPlanner::new(Arc::clone(&grid)),
            grid,
            geometry,
        })
    }

    /// Shared grid
    #[must_use]
    pub fn grid(&self) -> &WalkabilityGrid {
        &self.grid
    }

    /// Planner over the shared grid
    #[must_use]
    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    /// Level geometry used for local steering
    #[must_use]
    pub fn geometry(&self) -> &dyn LevelGeometry {
        self.geometry.as_ref()
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("bounds", &self.grid.bounds())
            .field("walkable", &self.grid.walkable_count())
            .finish()
    }
}
