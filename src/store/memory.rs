use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Collection, RecordStore};

/// In-process store used by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<u8>>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, collection: Collection) -> anyhow::Result<Option<Vec<u8>>> {
        let guard = self.collections.lock().expect("memory store poisoned");
        Ok(guard.get(&collection).cloned())
    }

    async fn write(&self, collection: Collection, bytes: Vec<u8>) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("read-only store");
        }
        let mut guard = self.collections.lock().expect("memory store poisoned");
        guard.insert(collection, bytes);
        Ok(())
    }

    async fn exists(&self, collection: Collection) -> bool {
        let guard = self.collections.lock().expect("memory store poisoned");
        guard.contains_key(&collection)
    }
}
