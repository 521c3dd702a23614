// Energy recovery rate, measured between two samples taken one interval apart.
use chrono::{DateTime, Utc};
use shared::models::{EnergyReading, RecoveryMeasurement};

#[derive(Debug, Default, Clone)]
pub struct RecoveryRateSampler {
    baseline: Option<(DateTime<Utc>, EnergyReading)>,
}

impl RecoveryRateSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<(DateTime<Utc>, EnergyReading)> {
        self.baseline
    }

    /// Feeds one sample. The first sample only sets the baseline; every later one
    /// yields a measurement and becomes the baseline of the next cycle.
    pub fn sample(
        &mut self,
        at: DateTime<Utc>,
        energy: EnergyReading,
    ) -> Option<RecoveryMeasurement> {
        let previous = self.baseline.replace((at, energy));
        let (started_at, start_energy) = previous?;

        let elapsed_hours = (at - started_at).num_milliseconds() as f64 / 3_600_000.0;
        let rate_per_hour = (energy as f64 - start_energy as f64) / elapsed_hours;

        Some(RecoveryMeasurement {
            started_at,
            finished_at: at,
            start_energy,
            end_energy: energy,
            rate_per_hour,
        })
    }

    pub fn reset(&mut self) {
        self.baseline = None;
    }
}
