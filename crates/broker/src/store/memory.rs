//! # インメモリ FileStore
//!
//! プロセス内のHashMapにレコードを保持する。
//! `STORE_BACKEND=memory` でのローカル起動とテストで使用する。

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{FileRecord, FileStore, StoreError};

/// HashMapによるFileStore実装。
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    records: RwLock<HashMap<String, FileRecord>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保持しているレコード数。
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait::async_trait]
impl FileStore for MemoryFileStore {
    async fn get(&self, id: &str) -> Result<FileRecord, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, record: &FileRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
