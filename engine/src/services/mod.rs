pub mod activity_log;
pub mod energy_monitor;

pub use energy_monitor::EnergyMonitor;
