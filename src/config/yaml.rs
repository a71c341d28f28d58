//! YAML representation of scheduler settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{ConfigError, SchedulerConfig};

/// On-disk shape: the cycle length in milliseconds, ratios as floats.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct YamlConfig {
    cycle_time_ms: u64,
    up_ratio: f64,
    burst_ratio: f64,
}

impl Default for YamlConfig {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            cycle_time_ms: defaults.cycle_time().as_millis() as u64,
            up_ratio: defaults.up_ratio(),
            burst_ratio: defaults.burst_ratio(),
        }
    }
}

impl SchedulerConfig {
    /// Parse configuration from a YAML string. Missing fields keep their
    /// defaults; the result is validated before it is returned.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: YamlConfig = serde_yaml::from_str(input)?;
        let config = SchedulerConfig::new()
            .with_cycle_time(Duration::from_millis(raw.cycle_time_ms))
            .with_up_ratio(raw.up_ratio)
            .with_burst_ratio(raw.burst_ratio);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}
