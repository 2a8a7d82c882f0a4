//! AI and navigation module
//!
//! Grid pathfinding, path following, steering behaviors and the chaser
//! state machine.

mod brain;
mod follower;
mod fsm;
mod grid;
mod heap;
mod pathfinding;
mod steering;

pub use brain::{Chaser, ChaserContext, ChaserSettings};
pub use follower::{
    ChasePolicy, FollowerSettings, MAX_SEARCH_RADIUS, PathFollower, PlanReport, correct_goal,
};
pub use fsm::{State, StateMachine, Transition};
pub use grid::{Cell, CellBounds, GridError, GridSettings, MAX_RING_RADIUS, WalkabilityGrid};
pub use heap::MinHeap;
pub use pathfinding::{
    DIAGONAL_COST, Navigator, Path, PathFailure, PathPlanner, STRAIGHT_COST, octile_distance,
    step_cost,
};
pub use steering::{MoveIntent, ObstacleSlide, Seek, SteeringBehavior, Wander, WanderSettings};
