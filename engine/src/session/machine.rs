// Mining session state machine
use crate::config::Thresholds;
use crate::page::PageAdapter;
use crate::services::activity_log::ActivityLog;
use crate::stats::{self, CumulativeExt};
use chrono::{DateTime, Utc};
use shared::models::{CumulativeStats, EnergyReading, MiningReport, MiningSession};
use shared::utils::gauge_format::format_thousands;

#[derive(Debug, Clone, PartialEq)]
pub enum MiningState {
    Idle,
    Mining(MiningSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ControlMissing,
    NoEnergyReading,
    DuplicateReading,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Skipped(SkipReason),
    /// Reading evaluated, nothing to do.
    Held,
    Started(MiningSession),
    /// Stop action performed. `None` when there was no session to close or the
    /// balance could not be read.
    Stopped(Option<MiningReport>),
}

#[derive(Debug)]
pub struct MiningEngine {
    thresholds: Thresholds,
    state: MiningState,
    last_energy: EnergyReading,
    first_check: bool,
    totals: CumulativeStats,
}

impl MiningEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self::with_totals(thresholds, CumulativeStats::default())
    }

    /// Continues accumulating on top of totals from an earlier run.
    pub fn with_totals(thresholds: Thresholds, totals: CumulativeStats) -> Self {
        MiningEngine {
            thresholds,
            state: MiningState::Idle,
            last_energy: 0,
            first_check: true,
            totals,
        }
    }

    pub fn state(&self) -> &MiningState {
        &self.state
    }

    pub fn session(&self) -> Option<&MiningSession> {
        match &self.state {
            MiningState::Mining(session) => Some(session),
            MiningState::Idle => None,
        }
    }

    pub fn is_mining(&self) -> bool {
        self.session().is_some()
    }

    pub fn totals(&self) -> CumulativeStats {
        self.totals
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn evaluate(
        &mut self,
        page: &dyn PageAdapter,
        now: DateTime<Utc>,
        log: &mut ActivityLog,
    ) -> Evaluation {
        let Some(affordance) = page.read_action_affordance() else {
            return Evaluation::Skipped(SkipReason::ControlMissing);
        };
        let Some(energy) = page.read_energy() else {
            return Evaluation::Skipped(SkipReason::NoEnergyReading);
        };
        if energy == self.last_energy && !self.first_check {
            return Evaluation::Skipped(SkipReason::DuplicateReading);
        }

        log.record(
            now,
            format!("Energy remaining: {:.2}%", self.thresholds.percent_of_capacity(energy)),
        );

        let outcome = if energy as f64 >= self.thresholds.start_at && affordance.is_start {
            self.start_session(page, now, energy, log)
        } else if energy as f64 <= self.thresholds.stop_at && affordance.is_stop {
            self.stop_session(page, now, energy, log)
        } else {
            tracing::trace!(energy, label = %affordance.label, "No transition");
            Evaluation::Held
        };

        self.last_energy = energy;
        self.first_check = false;
        outcome
    }

    fn start_session(
        &mut self,
        page: &dyn PageAdapter,
        now: DateTime<Utc>,
        energy: EnergyReading,
        log: &mut ActivityLog,
    ) -> Evaluation {
        if let MiningState::Mining(stale) = &self.state {
            tracing::warn!(
                started = %stale.start_time,
                "Control offers start while a session is open; discarding the open session"
            );
        }
        let session = MiningSession {
            start_time: now,
            start_balance: page.read_balance(),
            start_energy: energy,
        };
        self.state = MiningState::Mining(session.clone());

        page.perform_action();
        log.record(now, format!("Mining started at energy: {}", format_thousands(energy)));
        Evaluation::Started(session)
    }

    fn stop_session(
        &mut self,
        page: &dyn PageAdapter,
        now: DateTime<Utc>,
        energy: EnergyReading,
        log: &mut ActivityLog,
    ) -> Evaluation {
        let report = match std::mem::replace(&mut self.state, MiningState::Idle) {
            MiningState::Mining(session) => self.commit(&session, page, now, energy),
            MiningState::Idle => None,
        };

        page.perform_action();
        match &report {
            Some(report) => {
                log.record(now, stats::format_stop_report(report));
            }
            None => {
                tracing::debug!(energy, "Mining stopped without session statistics");
            }
        }
        Evaluation::Stopped(report)
    }

    fn commit(
        &mut self,
        session: &MiningSession,
        page: &dyn PageAdapter,
        now: DateTime<Utc>,
        energy: EnergyReading,
    ) -> Option<MiningReport> {
        let balance = page.read_balance()?;
        let session_stats = stats::session_stats(session, now, balance, energy)?;
        self.totals.fold(&session_stats);
        Some(stats::build_report(session_stats, self.totals))
    }

    /// Live figures for the open session. Totals are projected, never committed.
    pub fn peek(&self, page: &dyn PageAdapter, now: DateTime<Utc>) -> Option<MiningReport> {
        let session = self.session()?;
        let session_stats =
            stats::session_stats(session, now, page.read_balance()?, page.read_energy()?)?;
        let mut projected = self.totals;
        projected.fold(&session_stats);
        Some(stats::build_report(session_stats, projected))
    }

    /// Drops the open session without committing it.
    pub fn abandon(&mut self) -> Option<MiningSession> {
        match std::mem::replace(&mut self.state, MiningState::Idle) {
            MiningState::Mining(session) => Some(session),
            MiningState::Idle => None,
        }
    }
}
