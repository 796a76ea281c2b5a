use super::{RecordStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process record store for single-process runs and tests
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(key).and_then(|r| r.get(field)).cloned())
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned().unwrap_or_default())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn merge_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.entry(key.to_string()).or_default();
        for (field, value) in fields {
            record.insert((*field).to_string(), value.clone());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
