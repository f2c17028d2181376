use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    /// The condition did not hold within the allotted time. Nothing was mutated by the wait.
    #[error("Condition not met within {timeout:?} (elapsed {elapsed:?})")]
    Timeout { timeout: Duration, elapsed: Duration },
    #[error("Wait cancelled after {elapsed:?}")]
    Cancelled { elapsed: Duration },
    #[error("Failed to evaluate condition: {0}")]
    Predicate(#[from] eyre::Report),
}

impl PollerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollerError::Timeout { .. })
    }
}
