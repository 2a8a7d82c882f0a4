//! Fixed-step simulation clock

use std::time::Duration;

/// Simulation time advanced in fixed ticks
#[derive(Debug, Clone)]
pub struct Time {
    /// Length of one tick
    delta: Duration,
    /// Simulated time since start
    elapsed: Duration,
    /// Ticks run so far
    tick_count: u64,
}

impl Time {
    /// Create a clock ticking `tick_rate` times per simulated second
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            delta: Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1))),
            elapsed: Duration::ZERO,
            tick_count: 0,
        }
    }

    /// Advance by one tick
    pub fn advance(&mut self) {
        self.elapsed += self.delta;
        self.tick_count += 1;
    }

    /// Tick length
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Tick length in seconds
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Simulated time since start
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Simulated seconds since start
    #[must_use]
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Ticks run so far
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(50)
    }
}
