use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Energy in absolute units, as shown by the game's gauge.
pub type EnergyReading = i64;

/// Currency balance as shown by the game.
pub type BalanceReading = f64;

/// Labels the action control shows for each of its two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffordanceLabels {
    pub start: String,
    pub stop: String,
}

impl Default for AffordanceLabels {
    fn default() -> Self {
        Self {
            start: "Start mining".to_string(),
            stop: "Stop mining".to_string(),
        }
    }
}

/// Current actionable state of the mining control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAffordance {
    pub label: String,
    pub is_start: bool,
    pub is_stop: bool,
}

impl ActionAffordance {
    /// Classifies a control label. The label only has to contain the configured text.
    pub fn from_label(label: &str, labels: &AffordanceLabels) -> Self {
        let label = label.trim();
        Self {
            label: label.to_string(),
            is_start: !labels.start.is_empty() && label.contains(labels.start.as_str()),
            is_stop: !labels.stop.is_empty() && label.contains(labels.stop.as_str()),
        }
    }
}

/// Snapshot taken when a mining session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningSession {
    pub start_time: DateTime<Utc>,
    pub start_balance: Option<BalanceReading>,
    pub start_energy: EnergyReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_time_secs: f64,
    pub session_coins: f64,
    pub session_energy: i64,
    pub coins_per_hour: f64,
    pub coins_per_energy: f64,
}

/// Running totals over every committed session of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeStats {
    pub total_time_secs: f64,
    pub total_coins: f64,
    pub total_energy: f64,
}

/// Session figures together with the totals they were folded into (or would be).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MiningReport {
    pub session: SessionStats,
    pub totals: CumulativeStats,
    pub avg_coins_per_hour: f64,
    pub avg_coins_per_energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMeasurement {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub start_energy: EnergyReading,
    pub end_energy: EnergyReading,
    pub rate_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}
