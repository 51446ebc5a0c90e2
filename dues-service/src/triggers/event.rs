use crate::paths::{DueParams, PaymentParams};
use mongodb::bson::Document;

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    /// A due document was created. `snapshot` is its data, if the store
    /// delivered any.
    DueCreated {
        params: DueParams,
        snapshot: Option<Document>,
    },
    /// A payment record was created, updated or deleted.
    PaymentWritten {
        params: PaymentParams,
        before: Option<Document>,
        after: Option<Document>,
    },
}

impl TriggerEvent {
    pub fn due_created(params: DueParams, snapshot: Option<Document>) -> Self {
        TriggerEvent::DueCreated { params, snapshot }
    }

    pub fn payment_written(
        params: PaymentParams,
        before: Option<Document>,
        after: Option<Document>,
    ) -> Self {
        TriggerEvent::PaymentWritten {
            params,
            before,
            after,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TriggerEvent::DueCreated { .. } => "due_created",
            TriggerEvent::PaymentWritten { .. } => "payment_written",
        }
    }

    /// Path of the document whose write raised the event.
    pub fn path(&self) -> String {
        match self {
            TriggerEvent::DueCreated { params, .. } => params.path(),
            TriggerEvent::PaymentWritten { params, .. } => params.path(),
        }
    }
}
