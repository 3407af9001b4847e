//! Bounded backoff for partition table setup.
//!
//! Only [`ReliefError::ResourceLocked`] is retried. Every other error, including
//! constraint violations, is returned on the first attempt.

use crate::error::{ReliefError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl LockRetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep before attempt `attempt + 1`; doubles each time.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    pub async fn run<T, F, Fut>(&self, resource: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Err(ReliefError::ResourceLocked { cause, .. }) if attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} is locked, retrying in {:?} (attempt {}/{}): {}",
                        resource, delay, attempt, self.max_attempts, cause
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(ReliefError::ResourceLocked { cause, .. }) => {
                    return Err(ReliefError::Storage {
                        operation: format!("table setup for {}", resource),
                        cause: format!("still locked after {} attempts: {}", attempt, cause),
                    });
                }
                other => return other,
            }
        }
    }
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
