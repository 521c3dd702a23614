// Observer loop: one engine evaluation per notification batch.
use super::clock::MonitorClock;
use crate::page::{ChangeBatch, PageAdapter};
use crate::services::activity_log::ActivityLog;
use crate::session::MiningEngine;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

pub(super) async fn run_observer<P: PageAdapter>(
    run_id: Uuid,
    mut batches: mpsc::UnboundedReceiver<ChangeBatch>,
    engine: Arc<Mutex<MiningEngine>>,
    page: Arc<P>,
    log: Arc<Mutex<ActivityLog>>,
    clock: MonitorClock,
) {
    while let Some(batch) = batches.recv().await {
        if batch.is_empty() {
            continue;
        }
        let mut engine = engine.lock().await;
        let mut log = log.lock().await;
        let outcome = engine.evaluate(page.as_ref(), clock.now(), &mut log);
        tracing::debug!(run = %run_id, mutations = batch.len(), ?outcome, "Evaluated change batch");
    }
    tracing::debug!(run = %run_id, "Change notifications closed");
}
