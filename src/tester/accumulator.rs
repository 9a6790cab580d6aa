//! Shared success counter and the threshold math applied to it

use std::sync::Arc;
use tokio::sync::Mutex;

/// Lock-protected count of successful attempts, shared by every worker of a run
#[derive(Debug, Clone, Default)]
pub struct SuccessCounter {
    inner: Arc<Mutex<u64>>,
}

impl SuccessCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful attempt
    pub async fn increment(&self) {
        let mut count = self.inner.lock().await;
        *count += 1;
    }

    /// Current number of recorded successes
    pub async fn get(&self) -> u64 {
        *self.inner.lock().await
    }
}

/// Percentage of successful attempts, rounded down.
///
/// 2 successes out of 3 attempts is 66, not 67.
pub fn success_rate(successes: u64, attempts: u32) -> u32 {
    if attempts == 0 {
        return 0;
    }
    let rate = successes.saturating_mul(100) / u64::from(attempts);
    u32::try_from(rate).unwrap_or(u32::MAX)
}

/// Whether `rate` satisfies a threshold expressed in percent
pub fn meets_threshold(rate: u32, threshold: u32) -> bool {
    rate >= threshold
}
