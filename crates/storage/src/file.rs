use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::store::{ClientStorage, StorageError};

/// One file per key under a root directory. Writes go through a temp file
/// and a rename so a crash never leaves a half-written value behind.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, not user input, but a separator would
        // still escape the root.
        let safe: String = key
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' { ch } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }

    async fn ensure_root(&self, key: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io { key: key.to_string(), source })
    }
}

fn io_error(key: &str, source: std::io::Error) -> StorageError {
    StorageError::Io { key: key.to_string(), source }
}

async fn read_optional(path: &Path, key: &str) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path).await {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(io_error(key, error)),
    }
}

#[async_trait]
impl ClientStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        read_optional(&self.path_for(key), key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.ensure_root(key).await?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, value).await.map_err(|error| io_error(key, error))?;
        fs::rename(&staging, &path).await.map_err(|error| io_error(key, error))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(key, error)),
        }
    }
}
