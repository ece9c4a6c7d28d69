use std::time::Duration;

/// Fixed post-call delay applied after remote calls to stay under Cortex's
/// rate limits.
///
/// Kept as a value rather than inline sleeps so the discovery, detach and
/// reattach paths share one tunable policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(300),
        }
    }
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// A throttle that never sleeps.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the configured delay.
    pub async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        tokio::time::sleep(self.delay).await;
    }
}
