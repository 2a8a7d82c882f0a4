//! Steering behaviors for AI movement
//!
//! Produces movement intents for the external movement system: a unit
//! direction and a speed fraction. Used when there is no grid path to follow.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::physics::LevelGeometry;

/// Movement request handed to the movement system
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveIntent {
    /// Unit direction, or zero when stopped
    pub direction: Vec2,
    /// Fraction of the agent's top speed, in [0, 1]
    pub speed: f32,
}

impl MoveIntent {
    /// Stand still
    pub const STOP: Self = Self {
        direction: Vec2::ZERO,
        speed: 0.0,
    };

    /// Create an intent; the direction is normalized and the speed clamped.
    /// A zero direction gives [`Self::STOP`].
    #[must_use]
    pub fn new(direction: Vec2, speed: f32) -> Self {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return Self::STOP;
        }
        Self {
            direction,
            speed: speed.clamp(0.0, 1.0),
        }
    }

    /// Whether this intent asks the agent to stand still
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.direction == Vec2::ZERO || self.speed <= 0.0
    }

    /// Velocity for an agent with the given top speed
    #[must_use]
    pub fn velocity(&self, max_speed: f32) -> Vec2 {
        self.direction * self.speed * max_speed
    }
}

/// Trait for steering behaviors
pub trait SteeringBehavior {
    /// Calculate the intent for an agent at `position`
    fn calculate(&self, position: Vec2) -> MoveIntent;
}

/// Seek behavior - move straight towards target
#[derive(Debug, Clone)]
pub struct Seek {
    /// Target position
    pub target: Vec2,
    /// Speed fraction
    pub speed: f32,
}

impl Seek {
    /// Create a new seek behavior
    #[must_use]
    pub fn new(target: Vec2, speed: f32) -> Self {
        Self { target, speed }
    }
}

impl SteeringBehavior for Seek {
    fn calculate(&self, position: Vec2) -> MoveIntent {
        MoveIntent::new(self.target - position, self.speed)
    }
}

/// Seek that slides along walls.
///
/// Sweeps the agent's circle ahead toward the target. On contact it moves
/// along the wall surface, picking the tangent closest to the desired heading.
pub struct ObstacleSlide<'a> {
    /// Target position
    pub target: Vec2,
    /// Agent collision radius
    pub agent_radius: f32,
    /// Probe distance ahead of the agent
    pub look_ahead: f32,
    /// Speed fraction
    pub speed: f32,
    /// Obstacles to probe
    pub geometry: &'a dyn LevelGeometry,
}

impl SteeringBehavior for ObstacleSlide<'_> {
    fn calculate(&self, position: Vec2) -> MoveIntent {
        let to_target = self.target - position;
        if to_target.length_squared() < 1e-3 {
            return MoveIntent::STOP;
        }
        let desired = to_target.normalize();

        let Some(hit) =
            self.geometry
                .cast_circle(position, self.agent_radius, desired, self.look_ahead)
        else {
            return MoveIntent::new(desired, self.speed);
        };

        let mut slide = hit.normal.perp().normalize_or_zero();
        if (-slide).dot(desired) > slide.dot(desired) {
            slide = -slide;
        }

        MoveIntent::new(slide, self.speed)
    }
}

/// Timing for idle wandering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderSettings {
    /// Shortest walking stretch (seconds)
    pub move_time_min: f32,
    /// Longest walking stretch (seconds)
    pub move_time_max: f32,
    /// Shortest pause (seconds)
    pub idle_time_min: f32,
    /// Longest pause (seconds)
    pub idle_time_max: f32,
    /// Speed fraction while walking
    pub speed: f32,
}

impl Default for WanderSettings {
    fn default() -> Self {
        Self {
            move_time_min: 0.5,
            move_time_max: 1.2,
            idle_time_min: 0.6,
            idle_time_max: 1.4,
            speed: 0.25,
        }
    }
}

/// Wander behavior - alternating random walks and pauses
#[derive(Debug, Clone)]
pub struct Wander {
    /// Timing settings
    pub settings: WanderSettings,
    /// Current heading
    direction: Vec2,
    /// Whether the agent is in a walking stretch
    moving: bool,
    /// Time left in the current stretch
    timer: f32,
}

impl Wander {
    /// Create a new wander behavior, starting paused
    #[must_use]
    pub fn new(settings: WanderSettings) -> Self {
        Self {
            settings,
            direction: Vec2::X,
            moving: false,
            timer: 0.0,
        }
    }

    /// Restart from a paused state; the next update begins a new stretch
    pub fn reset(&mut self) {
        self.moving = false;
        self.timer = 0.0;
    }

    /// Whether the agent is currently walking
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Current heading
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Advance the timers, flipping between walking and pausing
    pub fn update<R: Rng>(&mut self, delta_time: f32, rng: &mut R) {
        self.timer -= delta_time;
        if self.timer > 0.0 {
            return;
        }

        self.moving = !self.moving;
        let s = &self.settings;

        if self.moving {
            self.timer = random_in(rng, s.move_time_min, s.move_time_max);
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            self.direction = Vec2::from_angle(angle);
        } else {
            self.timer = random_in(rng, s.idle_time_min, s.idle_time_max);
        }
    }
}

impl SteeringBehavior for Wander {
    fn calculate(&self, _position: Vec2) -> MoveIntent {
        if self.moving {
            MoveIntent::new(self.direction, self.settings.speed)
        } else {
            MoveIntent::STOP
        }
    }
}

fn random_in<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Aabb, StaticGeometry};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_move_intent_normalizes() {
        let intent = MoveIntent::new(Vec2::new(3.0, 4.0), 2.0);
        assert!((intent.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(intent.speed, 1.0);

        assert_eq!(MoveIntent::new(Vec2::ZERO, 1.0), MoveIntent::STOP);
        assert!(MoveIntent::STOP.is_stop());
        assert!((intent.velocity(5.0).length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_seek() {
        let seek = Seek::new(Vec2::new(10.0, 0.0), 0.5);
        let output = seek.calculate(Vec2::ZERO);

        assert!(output.direction.x > 0.99);
        assert_eq!(output.speed, 0.5);
    }

    #[test]
    fn test_slide_goes_straight_when_clear() {
        let geometry = StaticGeometry::new();
        let slide = ObstacleSlide {
            target: Vec2::new(5.0, 0.0),
            agent_radius: 0.45,
            look_ahead: 0.6,
            speed: 1.0,
            geometry: &geometry,
        };

        let output = slide.calculate(Vec2::ZERO);
        assert!((output.direction - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_slide_follows_wall_tangent() {
        // Wall directly east; target east and slightly north
        let geometry = StaticGeometry::new()
            .with_wall(Aabb::new(Vec2::new(1.0, -5.0), Vec2::new(2.0, 5.0)));
        let slide = ObstacleSlide {
            target: Vec2::new(6.0, 1.0),
            agent_radius: 0.45,
            look_ahead: 0.6,
            speed: 0.8,
            geometry: &geometry,
        };

        let output = slide.calculate(Vec2::new(0.2, 0.0));

        assert!((output.direction - Vec2::Y).length() < 1e-4);
        assert_eq!(output.speed, 0.8);

        // Target slightly south flips the tangent
        let south = ObstacleSlide {
            target: Vec2::new(6.0, -1.0),
            ..slide
        };
        let output = south.calculate(Vec2::new(0.2, 0.0));
        assert!((output.direction - Vec2::NEG_Y).length() < 1e-4);
    }

    #[test]
    fn test_slide_stops_on_target() {
        let geometry = StaticGeometry::new();
        let slide = ObstacleSlide {
            target: Vec2::ONE,
            agent_radius: 0.45,
            look_ahead: 0.6,
            speed: 1.0,
            geometry: &geometry,
        };
        assert!(slide.calculate(Vec2::ONE).is_stop());
    }

    #[test]
    fn test_wander_alternates() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut wander = Wander::new(WanderSettings::default());

        assert!(wander.calculate(Vec2::ZERO).is_stop());

        wander.update(0.02, &mut rng);
        assert!(wander.is_moving());
        let output = wander.calculate(Vec2::ZERO);
        assert!((output.direction.length() - 1.0).abs() < 1e-4);
        assert_eq!(output.speed, 0.25);

        // Longer than any walking stretch
        wander.update(1.3, &mut rng);
        assert!(!wander.is_moving());
        assert!(wander.calculate(Vec2::ZERO).is_stop());
    }
}
