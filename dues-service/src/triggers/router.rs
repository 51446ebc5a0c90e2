use super::event::TriggerEvent;
use crate::services::metrics;
use crate::services::{DocumentStore, StoreError};
use crate::sync::{AggregationHandler, FanoutHandler, FanoutOutcome};
use std::sync::Arc;
use std::time::Instant;

/// Routes a trigger event to its handler and records the invocation.
#[derive(Clone)]
pub struct TriggerRouter {
    fanout: FanoutHandler,
    aggregation: AggregationHandler,
}

impl TriggerRouter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            fanout: FanoutHandler::new(store.clone()),
            aggregation: AggregationHandler::new(store),
        }
    }

    pub fn aggregation(&self) -> &AggregationHandler {
        &self.aggregation
    }

    pub async fn route(&self, event: &TriggerEvent) -> Result<(), StoreError> {
        let start = Instant::now();

        match event {
            TriggerEvent::DueCreated { params, snapshot } => {
                let result = self.fanout.handle(params, snapshot.as_ref()).await;
                metrics::record_handler_duration("fanout", start.elapsed());
                match result {
                    Ok(FanoutOutcome::Skipped) => metrics::record_fanout("skipped", 0),
                    Ok(FanoutOutcome::Created(count)) => metrics::record_fanout("created", count),
                    Err(_) => metrics::record_fanout("failed", 0),
                }
                result.map(|_| ())
            }
            TriggerEvent::PaymentWritten { params, .. } => {
                let result = self.aggregation.handle(&params.due()).await;
                metrics::record_handler_duration("aggregation", start.elapsed());
                metrics::record_aggregation(if result.is_ok() { "ok" } else { "failed" });
                result.map(|_| ())
            }
        }
    }
}
