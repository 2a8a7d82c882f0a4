//! Navigation configuration
//!
//! One document gathering grid, follower and chaser tuning. Loaded from RON,
//! or JSON when the file ends in `.json`. Missing fields take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::{ChaserSettings, FollowerSettings, GridSettings, MAX_SEARCH_RADIUS};

/// Complete navigation tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Walkability grid layout
    pub grid: GridSettings,
    /// Path following
    pub follower: FollowerSettings,
    /// Chaser detection and wandering
    pub chaser: ChaserSettings,
}

impl NavConfig {
    /// Load a config file, picking the format from the extension
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_ron_str(&content)?
        };

        log::info!("Loaded navigation config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a RON document
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            ron::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty RON rendering of this config
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Save the config as pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = self.to_ron_string()?;
        fs::write(path, ron_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Check every value is usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("grid: {e}")))?;

        let f = &self.follower;
        check(positive(f.replan_interval), "follower.replan_interval")?;
        check(f.max_expansions > 0, "follower.max_expansions")?;
        check(positive(f.waypoint_reach_distance), "follower.waypoint_reach_distance")?;
        check(fraction(f.fallback_speed), "follower.fallback_speed")?;
        check(positive(f.agent_radius), "follower.agent_radius")?;
        check(f.look_ahead.is_finite() && f.look_ahead >= 0.0, "follower.look_ahead")?;
        check(f.goal_fix_radius <= MAX_SEARCH_RADIUS, "follower.goal_fix_radius")?;
        check(
            f.forced_search_radius <= MAX_SEARCH_RADIUS,
            "follower.forced_search_radius",
        )?;

        let c = &self.chaser;
        check(positive(c.detect_range), "chaser.detect_range")?;
        check(
            c.lost_range.is_finite() && c.lost_range >= c.detect_range,
            "chaser.lost_range",
        )?;

        let w = &c.wander;
        check(
            w.move_time_min >= 0.0 && w.move_time_max >= w.move_time_min,
            "chaser.wander.move_time",
        )?;
        check(
            w.idle_time_min >= 0.0 && w.idle_time_max >= w.idle_time_min,
            "chaser.wander.idle_time",
        )?;
        check(fraction(w.speed), "chaser.wander.speed")?;

        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn fraction(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

fn check(ok: bool, field: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} out of range")))
    }
}

/// Errors that can occur while loading or saving a config
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Parse error
    ParseError(String),
    /// Serialization error
    SerializeError(String),
    /// A value is out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::ParseError(e) => write!(f, "Parse error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::Invalid(e) => write!(f, "Invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChasePolicy;

    #[test]
    fn test_defaults_are_valid() {
        let config = NavConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.follower.max_expansions, 2500);
        assert_eq!(config.chaser.detect_range, 12.0);
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = NavConfig::default();
        config.follower.replan_interval = 0.5;
        config.grid.cell_size = 0.5;
        config.chaser.wander.speed = 0.4;

        let ron_str = config.to_ron_string().unwrap();
        assert!(ron_str.contains("replan_interval"));

        let loaded = NavConfig::from_ron_str(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let loaded = NavConfig::from_ron_str("(follower: (max_expansions: 500))").unwrap();

        assert_eq!(loaded.follower.max_expansions, 500);
        assert_eq!(loaded.follower.goal_fix_radius, 4);
        assert_eq!(loaded.grid, GridSettings::default());
    }

    #[test]
    fn test_json_file_load() {
        let path = std::env::temp_dir().join("pursuit_nav_config_test.json");
        fs::write(&path, r#"{ "chaser": { "detect_range": 6.0, "lost_range": 9.0 } }"#).unwrap();

        let loaded = NavConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.chaser.detect_range, 6.0);
        assert_eq!(loaded.chaser.lost_range, 9.0);
        assert_eq!(loaded.follower, FollowerSettings::default());
    }

    #[test]
    fn test_save_and_load_ron_file() {
        let path = std::env::temp_dir().join("pursuit_nav_config_test.ron");
        let config = NavConfig::default();

        config.save_ron(&path).unwrap();
        let loaded = NavConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = NavConfig::default();
        config.chaser.lost_range = 4.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = NavConfig::default();
        config.grid.cell_size = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = NavConfig::default();
        config.follower.max_expansions = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = NavConfig::default();
        config.follower.goal_fix_radius = 3_000_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = NavConfig::default();
        config.follower.forced_search_radius = MAX_SEARCH_RADIUS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = NavConfig::default();
        config.follower.goal_fix_radius = MAX_SEARCH_RADIUS;
        assert!(config.validate().is_ok());

        assert!(matches!(
            NavConfig::from_ron_str("(follower: (replan_interval: -1.0))"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_and_io_errors() {
        assert!(matches!(
            NavConfig::from_ron_str("(follower: ("),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            NavConfig::load("/nonexistent/navigation.ron"),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_policy_serializes_by_name() {
        let ron_str = ron::to_string(&ChasePolicy::Forced).unwrap();
        assert_eq!(ron_str, "Forced");
    }
}
