//! Core engine module
//!
//! Contains the headless Engine, its clock, debug stats and configuration

mod config;
mod debug;
mod engine;
mod time;

pub use config::{ConfigError, NavConfig};
pub use debug::{DebugInfo, PlannerStats};
pub use engine::{Engine, EngineConfig, EngineContext, Game};
pub use time::Time;
