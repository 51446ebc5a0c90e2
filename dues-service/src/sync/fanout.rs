use crate::models::PaymentRecord;
use crate::paths::DueParams;
use crate::services::{DocumentStore, StoreError};
use crate::utils::coerce_amount;
use mongodb::bson::Document;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutOutcome {
    /// The creation event carried no snapshot; nothing was read or written.
    Skipped,
    /// One record per member was committed (possibly zero).
    Created(usize),
}

/// Creates one unpaid payment record per organization member when a due is created.
#[derive(Clone)]
pub struct FanoutHandler {
    store: Arc<dyn DocumentStore>,
}

impl FanoutHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(
        skip(self, snapshot),
        fields(org_id = %due.org_id, due_id = %due.due_id)
    )]
    pub async fn handle(
        &self,
        due: &DueParams,
        snapshot: Option<&Document>,
    ) -> Result<FanoutOutcome, StoreError> {
        // A due document with no fields still fans out; only a missing snapshot is skipped.
        let Some(data) = snapshot else {
            tracing::debug!("Due creation event without data, skipping fan-out");
            return Ok(FanoutOutcome::Skipped);
        };

        let amount = coerce_amount(data.get("amount"));
        let members = self.store.list_members(&due.org_id).await?;

        let records: Vec<PaymentRecord> = members
            .iter()
            .map(|member| PaymentRecord::unpaid(&due.due_id, &member.uid, amount))
            .collect();
        let count = records.len();

        if records.is_empty() {
            tracing::info!("Organization has no members, no payment records created");
            return Ok(FanoutOutcome::Created(0));
        }

        self.store.commit_payments(due, records).await?;

        tracing::info!(records = count, amount, "Payment records created for due");
        Ok(FanoutOutcome::Created(count))
    }
}
