//! Boundary to the hosting service that actually creates commits.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use store::Configuration;

/// Everything the hosting service needs to create one commit.
#[derive(Clone)]
pub struct CommitRequest {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub file_path: String,
    pub author_email: String,
    pub author_name: String,
}

impl From<&Configuration> for CommitRequest {
    fn from(cfg: &Configuration) -> Self {
        Self {
            token: cfg.token.clone(),
            owner: cfg.owner.clone(),
            repo: cfg.repo.clone(),
            file_path: cfg.file_path.clone(),
            author_email: cfg.email.clone(),
            author_name: cfg.author_name.clone(),
        }
    }
}

impl fmt::Debug for CommitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitRequest")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("file_path", &self.file_path)
            .field("author_email", &self.author_email)
            .field("author_name", &self.author_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub sha: String,
    pub date: DateTime<Utc>,
}

/// Abstraction over the commit-creating service.
///
/// Implementations must never be called directly by scheduling code; go
/// through [`crate::CommitGuard`] so single-flight holds.
#[async_trait]
pub trait CommitClient: Send + Sync + 'static {
    async fn create_commit(&self, req: &CommitRequest) -> anyhow::Result<CommitReceipt>;
}
