//! Fixed backoff schedule between retry attempts.

use std::time::Duration;

/// Ordered list of delays; retries past the end reuse the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::new(delays_ms.iter().copied().map(Duration::from_millis).collect())
    }

    /// Delay to wait before retry number `retry` (1-based).
    /// An empty schedule never waits.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let Some(last) = self.delays.len().checked_sub(1) else {
            return Duration::ZERO;
        };
        let index = (retry.saturating_sub(1) as usize).min(last);
        self.delays[index]
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::from_millis(&[500, 1000, 2000])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_then_clamps() {
        let schedule = BackoffSchedule::default();
        assert_eq!(schedule.delay_for(1), Duration::from_millis(500));
        assert_eq!(schedule.delay_for(2), Duration::from_millis(1000));
        assert_eq!(schedule.delay_for(3), Duration::from_millis(2000));
        assert_eq!(schedule.delay_for(7), Duration::from_millis(2000));
    }

    #[test]
    fn test_empty_schedule_never_waits() {
        let schedule = BackoffSchedule::new(Vec::new());
        assert_eq!(schedule.delay_for(1), Duration::ZERO);
        assert_eq!(schedule.delay_for(0), Duration::ZERO);
    }
}
