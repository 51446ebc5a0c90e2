use crate::models::DueSummary;
use crate::paths::DueParams;
use crate::services::{DocumentStore, StoreError};
use crate::utils::{coerce_amount, is_truthy};
use mongodb::bson::Document;
use std::sync::Arc;
use tracing::instrument;

/// Reduce a due's full set of payment documents to its summary.
///
/// A record is paid when `paidAt` is set; only paid records contribute to
/// `total_collected`. Every record counts towards `total_members`.
pub fn summarize(payments: &[Document]) -> DueSummary {
    payments
        .iter()
        .fold(DueSummary::default(), |mut summary, payment| {
            if is_truthy(payment.get("paidAt")) {
                summary.total_collected += coerce_amount(payment.get("amount"));
                summary.paid_count += 1;
            }
            summary.total_members += 1;
            summary
        })
}

/// Recomputes a due's summary from every payment record under it.
///
/// The change that triggered the invocation is never consulted, so redundant
/// or reordered invocations converge on the same summary.
#[derive(Clone)]
pub struct AggregationHandler {
    store: Arc<dyn DocumentStore>,
}

impl AggregationHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(org_id = %due.org_id, due_id = %due.due_id))]
    pub async fn handle(&self, due: &DueParams) -> Result<DueSummary, StoreError> {
        let payments = self.store.list_payments(due).await?;
        let summary = summarize(&payments);

        self.store.merge_summary(due, &summary).await?;

        tracing::info!(
            total_collected = summary.total_collected,
            paid_count = summary.paid_count,
            total_members = summary.total_members,
            "Due summary recomputed"
        );
        Ok(summary)
    }
}
