use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use super::{Collection, RecordStore};

/// One pretty-printed JSON array per collection under `data_dir`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_of(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read(&self, collection: Collection) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_of(collection);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        Ok(Some(bytes))
    }

    async fn write(&self, collection: Collection, bytes: Vec<u8>) -> anyhow::Result<()> {
        let path = self.path_of(collection);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        // Plain overwrite: a crash mid-write leaves a truncated file.
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn exists(&self, collection: Collection) -> bool {
        tokio::fs::try_exists(self.path_of(collection))
            .await
            .unwrap_or(false)
    }
}
