use thiserror::Error;

/// Errors surfaced by [`crate::CommitGuard::execute`].
#[derive(Debug, Error)]
pub enum CommitError {
    /// Another commit is in flight. Callers decide whether to retry.
    #[error("another commit is already in flight")]
    Busy,

    #[error("commit operation failed: {0:#}")]
    External(anyhow::Error),
}

impl CommitError {
    pub fn is_busy(&self) -> bool {
        matches!(self, CommitError::Busy)
    }
}
