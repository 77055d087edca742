use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{ClientStorage, StorageError};

/// In-process store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStorage;
    use crate::store::{keys, ClientStorage};

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let storage = MemoryStorage::new();
        storage.set(keys::TOTAL_PRICE, "42.00".to_string()).await.expect("set");

        assert_eq!(
            storage.get(keys::TOTAL_PRICE).await.expect("get"),
            Some("42.00".to_string())
        );

        storage.remove(keys::TOTAL_PRICE).await.expect("remove");
        assert_eq!(storage.get(keys::TOTAL_PRICE).await.expect("get"), None);
    }
}
