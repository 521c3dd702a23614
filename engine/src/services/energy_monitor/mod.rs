// engine/src/services/energy_monitor/mod.rs
// Control surface of the tool: start/stop a monitoring run over a page adapter.
// A run owns the engine, the gauge subscription, the observer task and the
// recovery sampler task; stopping a run tears all of them down.

pub mod clock;
mod observer;
mod recovery_task;

use self::clock::MonitorClock;
use crate::config::MonitorSettings;
use crate::error::EngineError;
use crate::page::{ChangeMask, ObservedScope, PageAdapter, SubscriptionHandle};
use crate::services::activity_log::ActivityLog;
use crate::session::MiningEngine;
use shared::models::{CumulativeStats, LogRecord, MiningReport, RecoveryMeasurement};
use shared::utils::gauge_format::format_thousands;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

struct MonitorRun {
    id: Uuid,
    engine: Arc<Mutex<MiningEngine>>,
    subscription: SubscriptionHandle,
    observer: JoinHandle<()>,
    recovery: JoinHandle<()>,
}

pub struct EnergyMonitor<P: PageAdapter + 'static> {
    page: Arc<P>,
    log: Arc<Mutex<ActivityLog>>,
    clock: MonitorClock,
    // Totals of finished runs; the active run's engine continues from these.
    totals: CumulativeStats,
    last_recovery: Arc<Mutex<Option<RecoveryMeasurement>>>,
    run: Option<MonitorRun>,
}

impl<P: PageAdapter + 'static> EnergyMonitor<P> {
    pub fn new(page: Arc<P>) -> Self {
        Self::with_clock(page, MonitorClock::new())
    }

    pub fn with_clock(page: Arc<P>, clock: MonitorClock) -> Self {
        EnergyMonitor {
            page,
            log: Arc::new(Mutex::new(ActivityLog::new())),
            clock,
            totals: CumulativeStats::default(),
            last_recovery: Arc::new(Mutex::new(None)),
            run: None,
        }
    }

    pub fn page(&self) -> &Arc<P> {
        &self.page
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run.as_ref().map(|run| run.id)
    }

    /// Starts a monitoring run, stopping any run already in progress.
    pub async fn start(&mut self, settings: MonitorSettings) -> Result<Uuid, EngineError> {
        self.stop().await;

        let thresholds = settings.resolve()?;
        let now = self.clock.now();

        let subscription = self.page.subscribe(ObservedScope::EnergyGauge, ChangeMask::GAUGE);
        let Some(subscription) = subscription else {
            self.log.lock().await.record(now, "Energy element not found");
            return Err(EngineError::ScopeUnavailable("energy gauge".to_string()));
        };

        let id = Uuid::new_v4();
        let engine = Arc::new(Mutex::new(MiningEngine::with_totals(thresholds, self.totals)));
        {
            let mut engine = engine.lock().await;
            let mut log = self.log.lock().await;
            log.record(
                now,
                format!(
                    "Energy monitor activated. Capacity: {}, minimum energy: {}",
                    format_thousands(thresholds.capacity),
                    format_thousands(thresholds.stop_at.round() as i64)
                ),
            );
            let outcome = engine.evaluate(self.page.as_ref(), now, &mut log);
            tracing::debug!(run = %id, ?outcome, "Initial check");
        }

        let observer = tokio::spawn(observer::run_observer(
            id,
            subscription.batches,
            engine.clone(),
            self.page.clone(),
            self.log.clone(),
            self.clock,
        ));
        let recovery = tokio::spawn(recovery_task::run_recovery_sampler(
            id,
            settings.recovery_interval(),
            self.page.clone(),
            self.log.clone(),
            self.last_recovery.clone(),
            self.clock,
        ));

        tracing::info!(
            run = %id,
            capacity = thresholds.capacity,
            start_at = thresholds.start_at,
            stop_at = thresholds.stop_at,
            "Monitoring run started"
        );
        self.run = Some(MonitorRun {
            id,
            engine,
            subscription: subscription.handle,
            observer,
            recovery,
        });
        Ok(id)
    }

    /// Stops the current run. Returns false when nothing was running.
    pub async fn stop(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };

        self.page.unsubscribe(run.subscription);
        run.observer.abort();
        run.recovery.abort();
        let _ = run.observer.await;
        let _ = run.recovery.await;

        let mut engine = run.engine.lock().await;
        if let Some(session) = engine.abandon() {
            tracing::warn!(
                run = %run.id,
                started = %session.start_time,
                "Open mining session discarded on stop"
            );
        }
        self.totals = engine.totals();

        self.log.lock().await.record(self.clock.now(), "Energy monitor stopped");
        tracing::info!(run = %run.id, "Monitoring run stopped");
        true
    }

    /// Whether the active run currently has a mining session open.
    pub async fn is_mining(&self) -> bool {
        match &self.run {
            Some(run) => run.engine.lock().await.is_mining(),
            None => false,
        }
    }

    /// Live report for the open session, without committing anything.
    pub async fn peek(&self) -> Option<MiningReport> {
        let run = self.run.as_ref()?;
        let engine = run.engine.lock().await;
        engine.peek(self.page.as_ref(), self.clock.now())
    }

    pub async fn totals(&self) -> CumulativeStats {
        match &self.run {
            Some(run) => run.engine.lock().await.totals(),
            None => self.totals,
        }
    }

    pub async fn activity(&self) -> Vec<LogRecord> {
        self.log.lock().await.records()
    }

    pub async fn last_recovery(&self) -> Option<RecoveryMeasurement> {
        *self.last_recovery.lock().await
    }
}

impl<P: PageAdapter + 'static> Drop for EnergyMonitor<P> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            self.page.unsubscribe(run.subscription);
            run.observer.abort();
            run.recovery.abort();
        }
    }
}
