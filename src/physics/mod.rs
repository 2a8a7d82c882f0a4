//! Static collision queries for navigation
//!
//! Level geometry is read-only: boxes to build the walkability grid from and
//! swept circles for local steering.

mod world;

pub use world::{Aabb, CastHit, LevelGeometry, StaticGeometry};
