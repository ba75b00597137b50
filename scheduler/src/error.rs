use executor::CommitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("state storage failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SchedulerError {
    pub fn is_busy(&self) -> bool {
        matches!(self, SchedulerError::Commit(e) if e.is_busy())
    }
}
