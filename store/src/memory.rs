use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::repository::KeyValueRepository;

/// Process-local repository. Used by tests and by `--memory` runs.
#[derive(Default)]
pub struct MemoryRepository {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test convenience
    pub fn insert_direct(&self, key: &str, value: impl Into<String>) {
        self.map.lock().insert(key.to_string(), value.into());
    }

    pub fn get_direct(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueRepository for MemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
