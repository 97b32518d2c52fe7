//! Reconnect scheduling.

use std::time::Duration;

use obyava_shared::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS, RECONNECT_MAX_DELAY_MS,
};

/// Capped exponential backoff for socket reconnects.
///
/// The Nth attempt waits `min(base * 2^(N-1), max)`; after `max_attempts`
/// consecutive failures [`ReconnectPolicy::next_delay`] returns `None` and
/// the caller must surface a terminal disconnected state.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// The dashboard defaults: 5 attempts, 1 s base, 30 s cap.
    pub fn standard() -> Self {
        Self::new(
            MAX_RECONNECT_ATTEMPTS,
            Duration::from_millis(RECONNECT_BASE_DELAY_MS),
            Duration::from_millis(RECONNECT_MAX_DELAY_MS),
        )
    }

    /// Delay before the next attempt, or `None` once the cap is reached.
    /// Each call consumes one attempt.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(self.attempts))
            .min(self.max_delay);
        self.attempts += 1;
        Some(delay)
    }

    /// Called after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schedule_doubles_up_to_the_cap() {
        let mut policy = ReconnectPolicy::standard();
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000]);
        assert!(policy.exhausted());
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn long_schedules_cap_at_max_delay() {
        let mut policy = ReconnectPolicy::new(
            8,
            Duration::from_millis(1_000),
            Duration::from_millis(30_000),
        );
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000, 30_000]
        );
    }

    #[test]
    fn reset_rearms_the_schedule() {
        let mut policy = ReconnectPolicy::standard();
        while policy.next_delay().is_some() {}
        assert!(policy.exhausted());

        policy.reset();
        assert!(!policy.exhausted());
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1_000)));
    }
}
