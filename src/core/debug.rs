//! Debug and statistics module

use std::collections::VecDeque;

use crate::ai::PlanReport;

/// Planner workload tracker over a sliding window of ticks
#[derive(Debug)]
pub struct PlannerStats {
    /// Per-tick reports, newest last
    history: VecDeque<PlanReport>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Sum of everything ever recorded
    totals: PlanReport,
    /// Ticks recorded
    total_ticks: u64,
    /// Worst single-tick expansion count in the window
    peak_expansions: u32,
}

impl PlannerStats {
    /// Create a tracker keeping the last `max_samples` ticks
    pub fn new(max_samples: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            totals: PlanReport::default(),
            total_ticks: 0,
            peak_expansions: 0,
        }
    }

    /// Record the planner work of one tick
    pub fn record_tick(&mut self, report: PlanReport) {
        self.total_ticks += 1;
        self.totals.merge(report);

        if self.history.len() >= self.max_samples {
            self.history.pop_front();
        }
        self.history.push_back(report);

        self.peak_expansions = self
            .history
            .iter()
            .map(|r| r.expansions)
            .max()
            .unwrap_or(0);
    }

    /// Mean searches per tick over the window
    pub fn avg_searches(&self) -> f32 {
        self.window_mean(|r| r.searches)
    }

    /// Mean expansions per tick over the window
    pub fn avg_expansions(&self) -> f32 {
        self.window_mean(|r| r.expansions)
    }

    fn window_mean(&self, field: impl Fn(&PlanReport) -> u32) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.history.iter().map(|r| u64::from(field(r))).sum();
        sum as f32 / self.history.len() as f32
    }

    /// Highest expansion count of any tick in the window
    pub fn peak_expansions(&self) -> u32 {
        self.peak_expansions
    }

    /// Everything recorded since creation
    pub fn totals(&self) -> PlanReport {
        self.totals
    }

    /// Ticks recorded since creation
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "Planner: {:.2} searches/tick | {:.1} expansions/tick (peak: {}) | failures: {}",
            self.avg_searches(),
            self.avg_expansions(),
            self.peak_expansions,
            self.totals.failures
        )
    }
}

impl Default for PlannerStats {
    fn default() -> Self {
        Self::new(120)
    }
}

/// Debug information collected by the engine
#[derive(Debug, Default)]
pub struct DebugInfo {
    /// Whether periodic stats logging is enabled
    pub enabled: bool,
    /// Planner statistics
    pub planner_stats: PlannerStats,
    /// Custom debug lines
    custom_lines: Vec<String>,
}

impl DebugInfo {
    /// Create new debug info
    pub fn new() -> Self {
        Self {
            enabled: false,
            planner_stats: PlannerStats::default(),
            custom_lines: Vec::new(),
        }
    }

    /// Toggle periodic stats logging
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Add a custom debug line
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.custom_lines.push(line.into());
    }

    /// Clear custom lines
    pub fn clear_lines(&mut self) {
        self.custom_lines.clear();
    }

    /// Get all debug lines
    pub fn get_all_lines(&self) -> Vec<String> {
        let mut lines = vec![self.planner_stats.format_stats()];
        lines.extend(self.custom_lines.iter().cloned());
        lines
    }

    /// Record the planner work of one tick
    pub fn record_tick(&mut self, report: PlanReport) {
        self.planner_stats.record_tick(report);
    }
}
