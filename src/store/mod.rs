//! Durable visit record storage
//!
//! Each visit is one record (a Redis hash in production) keyed by
//! `visit:<visit_id>` with the fields `status`, `type_of_visit` and `report`.
//! `RecordStore` is the raw field-level capability; `VisitStore` layers the
//! typed visit operations the coordinator and executor need on top of it.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::report::Report;
use crate::visit::{Visit, VisitStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const FIELD_STATUS: &str = "status";
pub const FIELD_VISIT_TYPE: &str = "type_of_visit";
pub const FIELD_REPORT: &str = "report";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("stored {field} for {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Field-level keyed storage
///
/// Every single call is atomic for its key; there is no transaction across
/// calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read one field, `None` if the record or field is absent
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Read every field of a record, empty if the record is absent
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Write one field
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Write several fields in one atomic operation
    async fn merge_fields(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Typed visit operations over a `RecordStore`
#[derive(Clone)]
pub struct VisitStore {
    inner: Arc<dyn RecordStore>,
}

impl VisitStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self { inner }
    }

    pub fn backend_name(&self) -> &str {
        self.inner.name()
    }

    fn key(visit_id: &str) -> String {
        format!("visit:{}", visit_id)
    }

    /// Write the initial record for a new visit.
    pub async fn create(&self, visit_id: &str, visit_type: &str) -> Result<(), StoreError> {
        self.inner
            .merge_fields(
                &Self::key(visit_id),
                &[
                    (FIELD_STATUS, VisitStatus::Created.to_string()),
                    (FIELD_VISIT_TYPE, visit_type.to_string()),
                ],
            )
            .await
    }

    /// Current status, `None` if the visit does not exist.
    pub async fn status(&self, visit_id: &str) -> Result<Option<VisitStatus>, StoreError> {
        let raw = self.inner.get_field(&Self::key(visit_id), FIELD_STATUS).await?;
        Ok(raw.as_deref().map(VisitStatus::from))
    }

    pub async fn set_status(&self, visit_id: &str, status: &VisitStatus) -> Result<(), StoreError> {
        debug!("Visit {} status -> {}", visit_id, status);
        self.inner
            .set_field(&Self::key(visit_id), FIELD_STATUS, &status.to_string())
            .await
    }

    pub async fn visit_type(&self, visit_id: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_field(&Self::key(visit_id), FIELD_VISIT_TYPE).await
    }

    /// Latest stored report, `None` until a chunk has completed.
    pub async fn report(&self, visit_id: &str) -> Result<Option<Report>, StoreError> {
        let key = Self::key(visit_id);
        match self.inner.get_field(&key, FIELD_REPORT).await? {
            Some(raw) => Self::decode_report(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the report and set the status in a single write.
    pub async fn write_report(
        &self,
        visit_id: &str,
        report: &Report,
        status: &VisitStatus,
    ) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(report).map_err(StoreError::Serialize)?;

        self.inner
            .merge_fields(
                &Self::key(visit_id),
                &[(FIELD_REPORT, encoded), (FIELD_STATUS, status.to_string())],
            )
            .await
    }

    /// Read the whole visit record, `None` if it does not exist.
    pub async fn load(&self, visit_id: &str) -> Result<Option<Visit>, StoreError> {
        let key = Self::key(visit_id);
        let mut fields = self.inner.get_all(&key).await?;

        let Some(status) = fields.remove(FIELD_STATUS) else {
            return Ok(None);
        };

        let report = match fields.remove(FIELD_REPORT) {
            Some(raw) => Some(Self::decode_report(&key, &raw)?),
            None => None,
        };

        Ok(Some(Visit {
            visit_id: visit_id.to_string(),
            visit_type: fields.remove(FIELD_VISIT_TYPE),
            status: VisitStatus::from(status.as_str()),
            report,
        }))
    }

    fn decode_report(key: &str, raw: &str) -> Result<Report, StoreError> {
        serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            field: FIELD_REPORT,
            source,
        })
    }
}
