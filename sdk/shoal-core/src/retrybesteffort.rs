use std::fmt::Debug;
use std::time::Duration;

use crate::randgen;
use crate::retry::{RetryAction, RetryReason, RetryRequest, RetryStrategy};

#[derive(Debug, Clone)]
pub struct BestEffortRetryStrategy<Calc> {
    backoff_calc: Calc,
}

impl<Calc> BestEffortRetryStrategy<Calc>
where
    Calc: BackoffCalculator,
{
    pub fn new(calc: Calc) -> Self {
        Self { backoff_calc: calc }
    }
}

impl Default for BestEffortRetryStrategy<ExponentialBackoffCalculator> {
    fn default() -> Self {
        Self::new(ExponentialBackoffCalculator::default())
    }
}

impl<Calc> RetryStrategy for BestEffortRetryStrategy<Calc>
where
    Calc: BackoffCalculator,
{
    fn retry_after(&self, request: &RetryRequest, reason: &RetryReason) -> Option<RetryAction> {
        if request.is_idempotent() || reason.allows_non_idempotent_retry() {
            Some(RetryAction::new(
                self.backoff_calc.backoff(request.retry_attempts()),
            ))
        } else {
            None
        }
    }
}

pub trait BackoffCalculator: Debug + Send + Sync {
    fn backoff(&self, retry_attempts: u32) -> Duration;
}

#[derive(Clone, Debug)]
pub struct ExponentialBackoffCalculator {
    min: Duration,
    max: Duration,
    backoff_factor: f64,
    jitter: bool,
}

impl ExponentialBackoffCalculator {
    pub fn new(min: Duration, max: Duration, backoff_factor: f64) -> Self {
        Self {
            min,
            max,
            backoff_factor,
            jitter: true,
        }
    }

    pub(crate) fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

impl BackoffCalculator for ExponentialBackoffCalculator {
    fn backoff(&self, retry_attempts: u32) -> Duration {
        let factor = self.backoff_factor.powi(retry_attempts as i32);
        let factor_u128 = factor as u128;

        if self.min.as_millis() != 0 && u128::MAX / self.min.as_millis() < factor_u128 {
            return self.max;
        }

        let val = self.min.as_millis() * factor_u128;
        if val > u64::MAX as u128 {
            return self.max;
        }

        let mut backoff = Duration::from_millis(val as u64);

        if backoff > self.max {
            backoff = self.max;
        }
        if backoff < self.min {
            backoff = self.min;
        }

        if self.jitter && !backoff.is_zero() {
            // Spread concurrent retries out by up to half the backoff.
            let half = backoff.as_millis() as u64 / 2;
            if half > 0 {
                let extra = randgen::random_u64() % half;
                backoff = Duration::from_millis(backoff.as_millis() as u64 - half / 2 + extra);
            }
        }

        backoff
    }
}

impl Default for ExponentialBackoffCalculator {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1),
            max: Duration::from_millis(1000),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_without_jitter() {
        let calculator = ExponentialBackoffCalculator::new(
            Duration::from_millis(10),
            Duration::from_millis(1000),
            2.0,
        )
        .without_jitter();

        assert_eq!(calculator.backoff(0), Duration::from_millis(10));
        assert_eq!(calculator.backoff(1), Duration::from_millis(20));
        assert_eq!(calculator.backoff(2), Duration::from_millis(40));
        assert_eq!(calculator.backoff(6), Duration::from_millis(640));
        assert_eq!(calculator.backoff(7), Duration::from_millis(1000));
    }

    #[test]
    fn exponential_backoff_caps_overflow() {
        let calculator = ExponentialBackoffCalculator::new(
            Duration::from_millis(100),
            Duration::from_millis(1000),
            1.5,
        )
        .without_jitter();

        assert_eq!(calculator.backoff(207), Duration::from_millis(1000));
        assert_eq!(calculator.backoff(208), Duration::from_millis(1000));
    }

    #[test]
    fn jittered_backoff_stays_in_range() {
        let calculator = ExponentialBackoffCalculator::new(
            Duration::from_millis(100),
            Duration::from_millis(1000),
            2.0,
        );

        for attempt in 0..8 {
            let backoff = calculator.backoff(attempt);
            assert!(backoff <= Duration::from_millis(1500));
            assert!(backoff >= Duration::from_millis(25));
        }
    }

    #[test]
    fn non_idempotent_ops_skip_unsafe_reasons() {
        let strategy = BestEffortRetryStrategy::default();
        let request = RetryRequest::new("set", false);

        assert!(strategy
            .retry_after(&request, &RetryReason::SocketClosedWhileInFlight)
            .is_none());
        assert!(strategy
            .retry_after(&request, &RetryReason::KvTemporaryFailure)
            .is_some());
    }
}
