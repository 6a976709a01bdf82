//! Reconnect backoff.
//!
//! Exponential backoff with jitter and a bounded number of retries.

use std::time::Duration;

use rand::Rng;

use super::config::WsConfig;

/// Delay schedule between connect attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter_factor: f64,
    max_retries: u32,
    current: Duration,
    retries: u32,
}

impl Backoff {
    /// Creates a backoff schedule.
    #[must_use]
    pub fn new(
        initial: Duration,
        max: Duration,
        multiplier: f64,
        jitter_factor: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            initial,
            max,
            multiplier,
            jitter_factor,
            max_retries,
            current: initial,
            retries: 0,
        }
    }

    /// Creates a backoff schedule from the transport configuration.
    #[must_use]
    pub fn from_config(config: &WsConfig) -> Self {
        Self::new(
            config.reconnect_delay,
            config.max_reconnect_delay,
            config.backoff_multiplier,
            config.jitter_factor,
            config.max_reconnect_attempts,
        )
    }

    /// Returns the delay before the next retry, or `None` once retries are
    /// exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;

        let delay = self.jittered(self.current);

        let next = (self.current.as_millis() as f64 * self.multiplier).round();
        self.current = if next.is_finite() && next < self.max.as_millis() as f64 {
            Duration::from_millis(next as u64)
        } else {
            self.max
        };

        Some(delay)
    }

    /// Returns the number of retries handed out so far.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Restarts the schedule after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.retries = 0;
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter_factor <= 0.0 || base.is_zero() {
            return base;
        }

        let base_millis = base.as_millis() as f64;
        let spread = base_millis * self.jitter_factor;
        let offset: f64 = rand::rng().random_range(-spread..=spread);

        Duration::from_millis((base_millis + offset).round().max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(max_retries: u32) -> Backoff {
        Backoff::new(
            Duration::from_millis(100),
            Duration::from_millis(1000),
            2.0,
            0.0,
            max_retries,
        )
    }

    #[test]
    fn test_backoff_doubles() {
        let mut backoff = no_jitter(10);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn test_backoff_caps_at_max() {
        let mut backoff = no_jitter(10);
        for _ in 0..5 {
            let _ = backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_backoff_bounded_retries() {
        let mut backoff = no_jitter(2);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.retries(), 2);
    }

    #[test]
    fn test_backoff_zero_retries() {
        let mut backoff = no_jitter(0);
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = no_jitter(2);
        let _ = backoff.next_delay();
        let _ = backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.retries(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        for _ in 0..100 {
            let mut backoff = Backoff::new(
                Duration::from_millis(1000),
                Duration::from_secs(10),
                2.0,
                0.1,
                1,
            );
            let millis = backoff.next_delay().expect("delay").as_millis();
            assert!((900..=1100).contains(&millis), "delay {millis}ms out of range");
        }
    }

    #[test]
    fn test_backoff_from_config() {
        let config = WsConfig::default().with_max_reconnect_attempts(1);
        let mut backoff = Backoff::from_config(&config);
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
    }
}
