use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Wall-clock time anchored to tokio's monotonic clock, so timestamps follow
/// tokio's paused time in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonitorClock {
    wall_origin: DateTime<Utc>,
    origin: Instant,
}

impl MonitorClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    pub fn anchored_at(wall_origin: DateTime<Utc>) -> Self {
        MonitorClock { wall_origin, origin: Instant::now() }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + elapsed
    }
}

impl Default for MonitorClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_tokio_time() {
        let origin = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let clock = MonitorClock::anchored_at(origin);
        assert_eq!(clock.now(), origin);
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), origin + chrono::Duration::seconds(90));
    }
}
