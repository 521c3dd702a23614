// Periodic energy recovery measurement, owned and cancelled by the monitor run.
use super::clock::MonitorClock;
use crate::page::PageAdapter;
use crate::services::activity_log::ActivityLog;
use crate::stats::recovery::RecoveryRateSampler;
use shared::models::RecoveryMeasurement;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

pub(super) async fn run_recovery_sampler<P: PageAdapter>(
    run_id: Uuid,
    period: Duration,
    page: Arc<P>,
    log: Arc<Mutex<ActivityLog>>,
    last: Arc<Mutex<Option<RecoveryMeasurement>>>,
    clock: MonitorClock,
) {
    let mut sampler = RecoveryRateSampler::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(energy) = page.read_energy() else {
            tracing::debug!(run = %run_id, "Energy unreadable, recovery sample skipped");
            continue;
        };
        let now = clock.now();
        match sampler.sample(now, energy) {
            Some(measurement) => {
                log.lock().await.record(
                    now,
                    format!("Energy recovery rate: {:.2} units/hour", measurement.rate_per_hour),
                );
                *last.lock().await = Some(measurement);
            }
            None => {
                tracing::debug!(run = %run_id, energy, "Recovery baseline recorded");
            }
        }
    }
}
