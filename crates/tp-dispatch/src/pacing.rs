//! Randomized pacing between sends.

use rand::Rng;
use std::time::Duration;
use tp_config::PacingConfig;

/// Uniform random delay in `[min_delay, max_delay]`, whole milliseconds,
/// bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl PacingPolicy {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms: max_delay_ms.max(min_delay_ms),
        }
    }

    /// No delay at all
    pub fn immediate() -> Self {
        Self::new(0, 0)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn next_delay(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Suspend the current task for a freshly sampled delay.
    pub async fn pause(&self) -> Duration {
        let delay = self.next_delay();
        tokio::time::sleep(delay).await;
        delay
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

impl From<&PacingConfig> for PacingPolicy {
    fn from(config: &PacingConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        let policy = PacingPolicy::default();
        assert_eq!(policy.min_delay(), Duration::from_millis(10_000));
        assert_eq!(policy.max_delay(), Duration::from_millis(15_000));
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let policy = PacingPolicy::default();
        for _ in 0..1_000 {
            let delay = policy.next_delay();
            assert!(delay >= policy.min_delay() && delay <= policy.max_delay(), "{:?}", delay);
        }
    }

    #[test]
    fn test_fixed_range_is_deterministic() {
        let policy = PacingPolicy::new(250, 250);
        assert_eq!(policy.next_delay(), Duration::from_millis(250));
        assert_eq!(PacingPolicy::immediate().next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let policy = PacingPolicy::new(20, 10);
        assert_eq!(policy.min_delay(), Duration::from_millis(10));
        assert_eq!(policy.max_delay(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_for_sampled_delay() {
        let policy = PacingPolicy::new(10_000, 15_000);
        let start = tokio::time::Instant::now();
        let delay = policy.pause().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= delay && elapsed < delay + Duration::from_millis(2), "{:?}", elapsed);
        assert!(delay >= policy.min_delay() && delay <= policy.max_delay());
    }
}
