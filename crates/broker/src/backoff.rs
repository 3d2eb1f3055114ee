//! Retry-delay sequences used by the broker adapters.
//!
//! Grounded on `domain_intel.utils.safe_consumer`/`safe_producer` (exponential
//! backoff, 20 max tries) and `domain_intel.utils.info` (Fibonacci backoff
//! capped at 13, used for bootstrap readiness polling).

use std::time::Duration;

/// Maximum connection-acquisition attempts before giving up, matching
/// `backoff.expo(..., max_tries=20)` in the original implementation.
pub const MAX_CONNECT_ATTEMPTS: u32 = 20;

/// Exponential backoff delay for the `n`th attempt (0-indexed), doubling
/// from a 100ms base and capped at 30s so a stuck broker doesn't stall a
/// caller for hours.
pub fn exponential_delay(attempt: u32) -> Duration {
    let base_ms: u64 = 100;
    let capped_exp = attempt.min(18); // 100ms * 2^18 ~= 26s, keeps us under the 30s cap anyway
    let ms = base_ms.saturating_mul(1u64 << capped_exp);
    Duration::from_millis(ms.min(30_000))
}

/// Fibonacci sequence capped at `max_value`, matching `backoff.fibo(max_value=13)`.
/// Used by the bootstrap-readiness poll so retries space out quickly at first
/// then settle into a steady ~13s cadence.
pub struct FibonacciBackoff {
    prev: u64,
    curr: u64,
    max_value: u64,
}

impl FibonacciBackoff {
    pub fn new(max_value: u64) -> Self {
        Self { prev: 0, curr: 1, max_value }
    }

    pub fn next_delay(&mut self) -> Duration {
        let value = self.curr.min(self.max_value);
        let next = self.prev + self.curr;
        self.prev = self.curr;
        self.curr = next;
        Duration::from_secs(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delay_doubles_and_caps() {
        assert_eq!(exponential_delay(0), Duration::from_millis(100));
        assert_eq!(exponential_delay(1), Duration::from_millis(200));
        assert_eq!(exponential_delay(2), Duration::from_millis(400));
        assert_eq!(exponential_delay(30), Duration::from_millis(30_000));
    }

    #[test]
    fn fibonacci_backoff_caps_at_max_value() {
        let mut fib = FibonacciBackoff::new(13);
        let delays: Vec<u64> = (0..10).map(|_| fib.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 1, 2, 3, 5, 8, 13, 13, 13, 13]);
    }
}
