use crate::retry::{RetryAction, RetryReason, RetryRequest, RetryStrategy};

/// A strategy that never schedules a backoff retry. Reroute-style reasons
/// (not-my-vbucket and friends) still retry, they bypass the strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFastRetryStrategy {}

impl RetryStrategy for FailFastRetryStrategy {
    fn retry_after(&self, _request: &RetryRequest, _reason: &RetryReason) -> Option<RetryAction> {
        None
    }
}
