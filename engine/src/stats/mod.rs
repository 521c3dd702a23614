// Throughput statistics for mining sessions
pub mod recovery;

use chrono::{DateTime, Utc};
use shared::models::{
    BalanceReading, CumulativeStats, EnergyReading, MiningReport, MiningSession, SessionStats,
};

const SECS_PER_HOUR: f64 = 3600.0;

/// Coins per hour. A zero duration gives a non-finite result instead of panicking.
pub fn per_hour(amount: f64, seconds: f64) -> f64 {
    amount / seconds * SECS_PER_HOUR
}

/// Coins per 100 energy. Zero energy is counted as 1 unit.
pub fn per_hundred_energy(coins: f64, energy: f64) -> f64 {
    let divisor = if energy == 0.0 { 1.0 } else { energy };
    coins / divisor * 100.0
}

/// Figures for an open session against the current readings.
/// None without a start balance or when the energy spent does not fit in a reading.
pub fn session_stats(
    session: &MiningSession,
    now: DateTime<Utc>,
    current_balance: BalanceReading,
    current_energy: EnergyReading,
) -> Option<SessionStats> {
    let start_balance = session.start_balance?;
    let session_time_secs = (now - session.start_time).num_milliseconds() as f64 / 1000.0;
    let session_coins = current_balance - start_balance;
    let session_energy = session.start_energy.checked_sub(current_energy)?;

    Some(SessionStats {
        session_time_secs,
        session_coins,
        session_energy,
        coins_per_hour: per_hour(session_coins, session_time_secs),
        coins_per_energy: per_hundred_energy(session_coins, session_energy as f64),
    })
}

pub trait CumulativeExt {
    fn fold(&mut self, session: &SessionStats);
    fn avg_coins_per_hour(&self) -> f64;
    fn avg_coins_per_energy(&self) -> f64;
}

impl CumulativeExt for CumulativeStats {
    fn fold(&mut self, session: &SessionStats) {
        self.total_time_secs += session.session_time_secs;
        self.total_coins += session.session_coins;
        self.total_energy += session.session_energy as f64;
    }

    fn avg_coins_per_hour(&self) -> f64 {
        per_hour(self.total_coins, self.total_time_secs)
    }

    fn avg_coins_per_energy(&self) -> f64 {
        per_hundred_energy(self.total_coins, self.total_energy)
    }
}

pub fn build_report(session: SessionStats, totals: CumulativeStats) -> MiningReport {
    MiningReport {
        session,
        avg_coins_per_hour: totals.avg_coins_per_hour(),
        avg_coins_per_energy: totals.avg_coins_per_energy(),
        totals,
    }
}

/// Multi-line summary logged when a session is closed.
pub fn format_stop_report(report: &MiningReport) -> String {
    let s = &report.session;
    let t = &report.totals;
    format!(
        "Mining stopped:\n\
         \x20   Session duration: {:.1} s\n\
         \x20   Coins mined: {:.4}\n\
         \x20   Energy used: {}\n\
         \x20   Speed: {:.2} coins/hour\n\
         \x20   Efficiency: {:.4} coins/100 energy\n\
         \n\
         \x20   Overall:\n\
         \x20   Total mining time: {:.1} s\n\
         \x20   Total mined: {:.4} coins\n\
         \x20   Total energy used: {}\n\
         \x20   Average speed: {:.2} coins/hour\n\
         \x20   Average efficiency: {:.4} coins/100 energy",
        s.session_time_secs,
        s.session_coins,
        s.session_energy,
        s.coins_per_hour,
        s.coins_per_energy,
        t.total_time_secs,
        t.total_coins,
        t.total_energy,
        report.avg_coins_per_hour,
        report.avg_coins_per_energy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn session(balance: f64, energy: i64) -> MiningSession {
        MiningSession { start_time: t0(), start_balance: Some(balance), start_energy: energy }
    }

    fn stats(time: f64, coins: f64, energy: i64) -> SessionStats {
        SessionStats {
            session_time_secs: time,
            session_coins: coins,
            session_energy: energy,
            coins_per_hour: per_hour(coins, time),
            coins_per_energy: per_hundred_energy(coins, energy as f64),
        }
    }

    #[test]
    fn test_session_stats_basic() {
        let s = session(100.0, 9000);
        let result = session_stats(&s, t0() + Duration::seconds(1800), 110.0, 400).unwrap();
        assert_eq!(result.session_time_secs, 1800.0);
        assert!((result.session_coins - 10.0).abs() < 1e-9);
        assert_eq!(result.session_energy, 8600);
        assert!((result.coins_per_hour - 20.0).abs() < 1e-9);
        assert!((result.coins_per_energy - 10.0 / 8600.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_session_stats_fractional_seconds() {
        let s = session(0.0, 10);
        let result = session_stats(&s, t0() + Duration::milliseconds(1500), 1.0, 5).unwrap();
        assert_eq!(result.session_time_secs, 1.5);
    }

    #[test]
    fn test_zero_energy_uses_floor_of_one() {
        let s = session(10.0, 500);
        let result = session_stats(&s, t0() + Duration::seconds(60), 13.0, 500).unwrap();
        assert_eq!(result.session_energy, 0);
        assert!((result.coins_per_energy - 300.0).abs() < 1e-9);
        assert!(result.coins_per_energy.is_finite());
    }

    #[test]
    fn test_signed_values_are_not_clamped() {
        // Balance reset and energy grew during the session.
        let s = session(50.0, 100);
        let result = session_stats(&s, t0() + Duration::seconds(10), 20.0, 150).unwrap();
        assert!((result.session_coins + 30.0).abs() < 1e-9);
        assert_eq!(result.session_energy, -50);
        assert!((result.coins_per_energy - 60.0).abs() < 1e-9);
        assert!(result.coins_per_hour < 0.0);
    }

    #[test]
    fn test_zero_duration_is_non_finite() {
        let s = session(10.0, 500);
        let result = session_stats(&s, t0(), 15.0, 400).unwrap();
        assert_eq!(result.session_time_secs, 0.0);
        assert!(!result.coins_per_hour.is_finite());

        let idle = session_stats(&s, t0(), 10.0, 500).unwrap();
        assert!(idle.coins_per_hour.is_nan());
    }

    #[test]
    fn test_missing_start_balance_gives_no_stats() {
        let s = MiningSession { start_time: t0(), start_balance: None, start_energy: 9000 };
        assert!(session_stats(&s, t0() + Duration::seconds(5), 10.0, 100).is_none());
    }

    #[test]
    fn test_energy_out_of_range_gives_no_stats() {
        let s = session(100.0, 9000);
        let later = t0() + Duration::seconds(60);
        assert!(session_stats(&s, later, 110.0, i64::MIN).is_none());

        let s = session(100.0, i64::MIN);
        assert!(session_stats(&s, later, 110.0, 1).is_none());
        assert_eq!(session_stats(&s, later, 110.0, -1).unwrap().session_energy, i64::MIN + 1);
    }

    #[test]
    fn test_cumulative_two_sessions() {
        let mut totals = CumulativeStats::default();
        totals.fold(&stats(100.0, 5.0, 50));
        totals.fold(&stats(200.0, 10.0, 100));
        assert_eq!(totals.total_time_secs, 300.0);
        assert_eq!(totals.total_coins, 15.0);
        assert_eq!(totals.total_energy, 150.0);
        assert!((totals.avg_coins_per_hour() - 180.0).abs() < 1e-9);
        assert!((totals.avg_coins_per_energy() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cumulative_averages() {
        let totals = CumulativeStats::default();
        assert!(totals.avg_coins_per_hour().is_nan());
        assert_eq!(totals.avg_coins_per_energy(), 0.0);
    }

    #[test]
    fn test_build_and_format_report() {
        let session = stats(100.0, 5.0, 50);
        let mut totals = CumulativeStats::default();
        totals.fold(&session);
        let report = build_report(session, totals);
        assert!((report.avg_coins_per_hour - 180.0).abs() < 1e-9);

        let text = format_stop_report(&report);
        assert!(text.starts_with("Mining stopped:"));
        assert!(text.contains("Session duration: 100.0 s"));
        assert!(text.contains("Coins mined: 5.0000"));
        assert!(text.contains("Energy used: 50"));
        assert!(text.contains("Speed: 180.00 coins/hour"));
        assert!(text.contains("Efficiency: 10.0000 coins/100 energy"));
        assert!(text.contains("Average speed: 180.00 coins/hour"));
    }
}
