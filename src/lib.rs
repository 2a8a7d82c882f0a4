//! Grid-based pursuit navigation for 2D game agents
//!
//! This crate provides:
//! - A walkability grid sampled from level geometry
//! - Budgeted 8-directional A* over that grid
//! - Path following with periodic replanning and a forced-chase policy
//! - A patrol/chase agent brain and a headless fixed-tick engine

pub mod ai;
pub mod core;
pub mod ecs;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{
        Cell, ChasePolicy, Chaser, ChaserSettings, FollowerSettings, GridSettings, MoveIntent,
        Navigator, PathFollower, WalkabilityGrid,
    };
    pub use crate::core::{
        DebugInfo, Engine, EngineConfig, EngineContext, Game, NavConfig, PlannerStats,
    };
    pub use crate::ecs::{MoveSpeed, Name, Position, Velocity, World};
    pub use crate::physics::{Aabb, LevelGeometry, StaticGeometry};
    pub use glam::Vec2;
}
