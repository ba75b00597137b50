use anyhow::Result;
use async_trait::async_trait;

/// Flat key/value persistence for the scheduler's records.
///
/// Values are opaque JSON documents; typing happens in [`crate::StateStore`].
#[async_trait]
pub trait KeyValueRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
