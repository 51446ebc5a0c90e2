use crate::models::{DueSummary, Member, PaymentRecord};
use crate::paths::DueParams;
use async_trait::async_trait;
use mongodb::bson::Document;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] mongodb::bson::de::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// The narrow read/batch-write surface both sync handlers need.
///
/// Reads are unbounded: a whole collection is returned in one pass.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Members of `organizations/{org_id}/members`.
    async fn list_members(&self, org_id: &str) -> Result<Vec<Member>, StoreError>;

    /// Raw payment documents under the due, as stored.
    async fn list_payments(&self, due: &DueParams) -> Result<Vec<Document>, StoreError>;

    /// Set every record at `due_payments/{record.id}` in one all-or-nothing
    /// batch, overwriting existing documents. The store stamps `createdAt`.
    async fn commit_payments(
        &self,
        due: &DueParams,
        records: Vec<PaymentRecord>,
    ) -> Result<(), StoreError>;

    /// Merge the summary fields into `meta/summary`, creating it if missing.
    async fn merge_summary(&self, due: &DueParams, summary: &DueSummary)
        -> Result<(), StoreError>;

    /// Current summary document, without store metadata.
    async fn get_summary(&self, due: &DueParams) -> Result<Option<Document>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
