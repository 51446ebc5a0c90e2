//! MongoDB change streams as the trigger source.
//!
//! Due inserts raise `DueCreated`; any insert, update, replace or delete of a
//! payment record raises `PaymentWritten`. The driver resumes the streams
//! after transient errors; anything else ends the feed with an error.
//!
//! The resume token of every handled change is saved once the event is
//! queued, and each stream restarts from its saved token. Changes made while
//! the service was down are therefore still delivered. A token that has
//! fallen off the oplog makes `watch` fail, and the service stops until the
//! checkpoint is cleared.

use super::event::TriggerEvent;
use crate::paths::{DueParams, PaymentParams};
use crate::services::database::{strip_metadata, MongoStore};
use futures::StreamExt;
use mongodb::bson::{doc, Document};
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType, ResumeToken};
use mongodb::options::{ChangeStreamOptions, FullDocumentBeforeChangeType, FullDocumentType};
use service_core::error::AppError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DUES_STREAM: &str = "dues";
const PAYMENTS_STREAM: &str = "due_payments";

/// Path of the changed document, taken from `documentKey._id`.
fn changed_path(document_key: Option<&Document>) -> Option<&str> {
    document_key?.get_str("_id").ok()
}

/// Translate a `dues` change into a trigger. Only inserts fire.
pub fn due_event(
    operation: &OperationType,
    document_key: Option<&Document>,
    full_document: Option<Document>,
) -> Option<TriggerEvent> {
    if !matches!(operation, OperationType::Insert) {
        return None;
    }

    let path = changed_path(document_key)?;
    let params = DueParams::parse(path)?;
    Some(TriggerEvent::due_created(
        params,
        full_document.map(strip_metadata),
    ))
}

/// Translate a `due_payments` change into a trigger.
pub fn payment_event(
    operation: &OperationType,
    document_key: Option<&Document>,
    after: Option<Document>,
    before: Option<Document>,
) -> Option<TriggerEvent> {
    let after = match operation {
        OperationType::Insert | OperationType::Update | OperationType::Replace => after,
        OperationType::Delete => None,
        _ => return None,
    };

    let path = changed_path(document_key)?;
    let params = PaymentParams::parse(path)?;
    Some(TriggerEvent::payment_written(
        params,
        before.map(strip_metadata),
        after.map(strip_metadata),
    ))
}

pub struct ChangeFeed {
    store: MongoStore,
    events: mpsc::Sender<TriggerEvent>,
    shutdown: CancellationToken,
}

impl ChangeFeed {
    pub fn new(
        store: MongoStore,
        events: mpsc::Sender<TriggerEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            events,
            shutdown,
        }
    }

    /// Watch both collections until shutdown or a non-resumable error.
    pub async fn run(self) -> Result<(), AppError> {
        tracing::info!("Change feed started");
        tokio::try_join!(self.watch_dues(), self.watch_payments())?;
        tracing::info!("Change feed stopped");
        Ok(())
    }

    async fn watch_dues(&self) -> Result<(), AppError> {
        let pipeline = [doc! { "$match": { "operationType": "insert" } }];
        let options = ChangeStreamOptions::builder()
            .resume_after(self.saved_token(DUES_STREAM).await?)
            .build();
        let mut stream = self.store.dues().watch(pipeline, options).await?;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                next = stream.next() => match next {
                    Some(Ok(change)) => {
                        let ChangeStreamEvent {
                            id,
                            operation_type,
                            document_key,
                            full_document,
                            ..
                        } = change;
                        match due_event(&operation_type, document_key.as_ref(), full_document) {
                            Some(event) => self.forward(event).await?,
                            None => tracing::warn!(
                                document_key = ?document_key,
                                "Ignoring due insert with unrecognized path"
                            ),
                        }
                        self.store.save_resume_token(DUES_STREAM, &id).await?;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Due change stream failed: {}", e);
                        return Err(e.into());
                    }
                    None => return Ok(()),
                }
            }
        }
    }

    async fn watch_payments(&self) -> Result<(), AppError> {
        let pipeline = [doc! {
            "$match": { "operationType": { "$in": ["insert", "update", "replace", "delete"] } }
        }];
        let options = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .full_document_before_change(Some(FullDocumentBeforeChangeType::WhenAvailable))
            .resume_after(self.saved_token(PAYMENTS_STREAM).await?)
            .build();
        let mut stream = self.store.payments().watch(pipeline, options).await?;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                next = stream.next() => match next {
                    Some(Ok(change)) => {
                        let ChangeStreamEvent {
                            id,
                            operation_type,
                            document_key,
                            full_document,
                            full_document_before_change,
                            ..
                        } = change;
                        match payment_event(
                            &operation_type,
                            document_key.as_ref(),
                            full_document,
                            full_document_before_change,
                        ) {
                            Some(event) => self.forward(event).await?,
                            None => tracing::warn!(
                                document_key = ?document_key,
                                "Ignoring payment change with unrecognized path"
                            ),
                        }
                        self.store.save_resume_token(PAYMENTS_STREAM, &id).await?;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Payment change stream failed: {}", e);
                        return Err(e.into());
                    }
                    None => return Ok(()),
                }
            }
        }
    }

    async fn saved_token(&self, stream: &'static str) -> Result<Option<ResumeToken>, AppError> {
        let token = self.store.load_resume_token(stream).await?;
        if token.is_some() {
            tracing::info!(stream, "Resuming change stream from saved token");
        } else {
            tracing::info!(stream, "No saved resume token, watching from now");
        }
        Ok(token)
    }

    async fn forward(&self, event: TriggerEvent) -> Result<(), AppError> {
        tracing::debug!(kind = event.kind(), path = %event.path(), "Change received");
        self.events
            .send(event)
            .await
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("Trigger queue closed")))
    }
}
