/// Consecutive-failure counter for a running source.
///
/// Any good observation resets it; reaching the threshold means the source
/// should be given up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    consecutive: u32,
    threshold: u32,
}

impl RetryState {
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold: threshold.max(1),
        }
    }

    /// Count one failure. Returns `true` once the threshold is reached.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.is_exhausted()
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_exhausted(&self) -> bool {
        self.consecutive >= self.threshold
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_NO_DATA_THRESHOLD)
    }
}
