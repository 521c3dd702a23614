// Monitor settings, loaded from a JSON file and/or command-line flags.
use crate::error::EngineError;
use serde::Deserialize;
use shared::models::AffordanceLabels;
use std::path::Path;
use std::time::Duration;

/// Capacity assumed when the gauge only reports a percentage.
pub const PERCENT_SCALE_CAPACITY: i64 = 100;

/// Unit of `min_energy_threshold`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    #[default]
    Absolute,
    Percent,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorSettings {
    pub capacity_energy: Option<i64>,
    pub min_energy_threshold: f64,
    pub threshold_unit: ThresholdUnit,
    pub start_threshold_percent: f64,
    pub recovery_interval_secs: u64,
    pub labels: AffordanceLabels,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            capacity_energy: Some(9000),
            min_energy_threshold: 500.0,
            threshold_unit: ThresholdUnit::Absolute,
            start_threshold_percent: 100.0,
            recovery_interval_secs: 30 * 60,
            labels: AffordanceLabels::default(),
        }
    }
}

/// Start/stop levels in absolute energy units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub capacity: i64,
    pub start_at: f64,
    pub stop_at: f64,
}

impl Thresholds {
    pub fn percent_of_capacity(&self, energy: i64) -> f64 {
        energy as f64 / self.capacity as f64 * 100.0
    }
}

impl MonitorSettings {
    pub fn new(capacity_energy: i64, min_energy_threshold: f64) -> Self {
        MonitorSettings {
            capacity_energy: Some(capacity_energy),
            min_energy_threshold,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let settings: MonitorSettings = serde_json::from_str(json)?;
        settings.resolve()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn capacity(&self) -> i64 {
        self.capacity_energy.unwrap_or(PERCENT_SCALE_CAPACITY)
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_secs(self.recovery_interval_secs)
    }

    /// Validates the settings and turns them into absolute start/stop levels.
    pub fn resolve(&self) -> Result<Thresholds, EngineError> {
        let capacity = self.capacity();
        if capacity <= 0 {
            return Err(EngineError::ConfigError(format!(
                "capacity_energy must be positive, got {}",
                capacity
            )));
        }
        if !self.min_energy_threshold.is_finite() || self.min_energy_threshold < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "min_energy_threshold must be a non-negative number, got {}",
                self.min_energy_threshold
            )));
        }
        if !(self.start_threshold_percent > 0.0 && self.start_threshold_percent <= 100.0) {
            return Err(EngineError::ConfigError(format!(
                "start_threshold_percent must be in (0, 100], got {}",
                self.start_threshold_percent
            )));
        }
        if self.recovery_interval_secs == 0 {
            return Err(EngineError::ConfigError(
                "recovery_interval_secs must be greater than 0".to_string(),
            ));
        }

        let start_at = capacity as f64 * self.start_threshold_percent / 100.0;
        let stop_at = match self.threshold_unit {
            ThresholdUnit::Absolute => self.min_energy_threshold,
            ThresholdUnit::Percent => capacity as f64 * self.min_energy_threshold / 100.0,
        };
        if stop_at >= start_at {
            return Err(EngineError::ConfigError(format!(
                "minimum energy ({}) must be below the start level ({})",
                stop_at, start_at
            )));
        }

        Ok(Thresholds { capacity, start_at, stop_at })
    }
}
