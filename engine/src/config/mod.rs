pub mod settings;

pub use settings::{MonitorSettings, ThresholdUnit, Thresholds};
