// Energy monitor entry point: replays a recorded page script through the monitor.
use anyhow::{Context, Result};
use clap::Parser;
use engine::config::{MonitorSettings, ThresholdUnit};
use engine::page::memory::{GaugeScale, MemoryPage};
use engine::page::replay::ReplayScript;
use engine::services::EnergyMonitor;
use engine::stats::CumulativeExt;
use serde::Serialize;
use shared::models::{CumulativeStats, MiningReport, RecoveryMeasurement};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments for the energy monitor
#[derive(Parser, Debug)]
#[command(
    name = "energy-monitor",
    version,
    about = "Starts and stops mining at energy thresholds and reports mining throughput",
    long_about = "Replays a recorded mining-tab script (offset_secs;energy;balance;button) \
                  through the energy monitor.\n\n\
                  Example:\n  \
                  energy-monitor --script session.csv --capacity 9000 --min-energy 500 --speed 60"
)]
struct Args {
    /// Replay script to play against the simulated page
    #[arg(long, value_name = "CSV")]
    script: PathBuf,

    /// JSON settings file; flags below override its values
    #[arg(short, long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Maximum energy; mining starts when the gauge reaches it
    #[arg(long, value_name = "UNITS")]
    capacity: Option<i64>,

    /// Energy level at or below which mining stops
    #[arg(long, value_name = "LEVEL")]
    min_energy: Option<f64>,

    /// Read --min-energy as a percentage of capacity
    #[arg(long)]
    min_energy_percent: bool,

    /// Gauge renders a percentage instead of absolute units
    #[arg(long)]
    percent_gauge: bool,

    /// Label the control shows when mining can be started
    #[arg(long, value_name = "TEXT")]
    start_label: Option<String>,

    /// Label the control shows when mining can be stopped
    #[arg(long, value_name = "TEXT")]
    stop_label: Option<String>,

    /// Replay speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Print a JSON summary on exit
    #[arg(long)]
    report_json: bool,
}

impl Args {
    fn settings(&self) -> Result<MonitorSettings> {
        let mut settings = match &self.config {
            Some(path) => MonitorSettings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => MonitorSettings::default(),
        };
        if let Some(capacity) = self.capacity {
            settings.capacity_energy = Some(capacity);
        }
        if let Some(min_energy) = self.min_energy {
            settings.min_energy_threshold = min_energy;
        }
        if self.min_energy_percent {
            settings.threshold_unit = ThresholdUnit::Percent;
        }
        if let Some(label) = &self.start_label {
            settings.labels.start = label.clone();
        }
        if let Some(label) = &self.stop_label {
            settings.labels.stop = label.clone();
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            anyhow::bail!("--speed must be a positive number, got {}", self.speed);
        }
        settings.resolve()?;
        Ok(settings)
    }
}

#[derive(Serialize)]
struct Summary {
    totals: CumulativeStats,
    avg_coins_per_hour: f64,
    avg_coins_per_energy: f64,
    open_session: Option<MiningReport>,
    last_recovery: Option<RecoveryMeasurement>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let settings = args.settings()?;
    let script = ReplayScript::from_path(&args.script)
        .with_context(|| format!("Failed to load replay script {}", args.script.display()))?;
    info!(
        steps = script.steps().len(),
        duration_secs = script.duration().as_secs_f64(),
        "Loaded replay script"
    );

    let mut page = MemoryPage::new(settings.labels.clone()).simulating_game();
    if args.percent_gauge {
        page = page.with_scale(GaugeScale::Percent { capacity: settings.capacity() });
    }
    let page = Arc::new(page);

    let mut monitor = EnergyMonitor::new(page.clone());
    let run_id = monitor.start(settings).await?;
    info!(run = %run_id, "Energy monitor running");

    let replay = tokio::select! {
        played = script.play(&page, args.speed) => Some(played),
        _ = tokio::signal::ctrl_c() => None,
    };
    match &replay {
        Some(Ok(steps)) => info!(steps, "Replay finished"),
        Some(Err(e)) => error!(error = %e, "Replay aborted"),
        None => info!("Interrupted"),
    }
    // Let the observer drain the last notifications.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let open_session = monitor.peek().await;
    monitor.stop().await;
    let totals = monitor.totals().await;
    info!(
        total_time_secs = totals.total_time_secs,
        total_coins = totals.total_coins,
        total_energy = totals.total_energy,
        "Final totals"
    );

    if args.report_json {
        let summary = Summary {
            totals,
            avg_coins_per_hour: totals.avg_coins_per_hour(),
            avg_coins_per_energy: totals.avg_coins_per_energy(),
            open_session,
            last_recovery: monitor.last_recovery().await,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if let Some(Err(e)) = replay {
        return Err(e.into());
    }

    Ok(())
}
