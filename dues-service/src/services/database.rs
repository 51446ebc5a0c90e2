//! MongoDB-backed document store.
//!
//! Each document kind has its own collection. A document's `_id` is its full
//! hierarchical path and `parent` holds the collection path it lives in, so
//! listing a sub-collection is a single indexed `find` on `parent`.

use super::store::{DocumentStore, StoreError};
use crate::models::{DueSummary, Member, PaymentRecord};
use crate::paths::{self, DueParams};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, DateTime as BsonDateTime, Document},
    change_stream::event::ResumeToken,
    options::{FindOptions, IndexOptions, ReplaceOptions, UpdateOptions},
    Client as MongoClient, ClientSession, Collection, Database, IndexModel,
};
use service_core::error::AppError;

pub const MEMBERS_COLLECTION: &str = "members";
pub const DUES_COLLECTION: &str = "dues";
pub const PAYMENTS_COLLECTION: &str = "due_payments";
pub const META_COLLECTION: &str = "due_meta";
pub const CHECKPOINTS_COLLECTION: &str = "change_feed_checkpoints";

/// Store-owned field naming the collection path of a document.
pub const PARENT_FIELD: &str = "parent";

/// Drop store bookkeeping (`_id`, `parent`) from a raw document.
pub fn strip_metadata(mut document: Document) -> Document {
    document.remove("_id");
    document.remove(PARENT_FIELD);
    document
}

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for dues-service");

        for collection in [MEMBERS_COLLECTION, DUES_COLLECTION, PAYMENTS_COLLECTION] {
            let parent_index = IndexModel::builder()
                .keys(doc! { PARENT_FIELD: 1 })
                .options(
                    IndexOptions::builder()
                        .name("parent_idx".to_string())
                        .build(),
                )
                .build();

            self.db
                .collection::<Document>(collection)
                .create_index(parent_index, None)
                .await
                .map_err(|e| {
                    tracing::error!(collection = %collection, "Failed to create parent index: {}", e);
                    AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
                })?;
        }

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn members(&self) -> Collection<Document> {
        self.db.collection(MEMBERS_COLLECTION)
    }

    pub fn dues(&self) -> Collection<Document> {
        self.db.collection(DUES_COLLECTION)
    }

    pub fn payments(&self) -> Collection<Document> {
        self.db.collection(PAYMENTS_COLLECTION)
    }

    pub fn meta(&self) -> Collection<Document> {
        self.db.collection(META_COLLECTION)
    }

    fn checkpoints(&self) -> Collection<Document> {
        self.db.collection(CHECKPOINTS_COLLECTION)
    }

    /// Last resume token saved for a change stream, if any.
    pub async fn load_resume_token(&self, stream: &str) -> Result<Option<ResumeToken>, StoreError> {
        let checkpoint = self.checkpoints().find_one(doc! { "_id": stream }, None).await?;
        match checkpoint.and_then(|mut document| document.remove("token")) {
            Some(token) => Ok(Some(bson::from_bson(token)?)),
            None => Ok(None),
        }
    }

    pub async fn save_resume_token(
        &self,
        stream: &str,
        token: &ResumeToken,
    ) -> Result<(), StoreError> {
        self.checkpoints()
            .update_one(
                doc! { "_id": stream },
                doc! { "$set": { "token": bson::to_bson(token)?, "updatedAt": BsonDateTime::now() } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    async fn write_batch(
        &self,
        session: &mut ClientSession,
        due: &DueParams,
        records: &[PaymentRecord],
    ) -> Result<(), StoreError> {
        let parent = paths::payments_collection(&due.org_id, &due.due_id);
        let created_at = BsonDateTime::now();

        for record in records {
            let path = paths::payment_doc(&due.org_id, &due.due_id, &record.id);
            let mut document = bson::to_document(record)?;
            document.insert("_id", path.clone());
            document.insert(PARENT_FIELD, parent.clone());
            document.insert("createdAt", created_at);

            self.payments()
                .replace_one_with_session(
                    doc! { "_id": &path },
                    document,
                    ReplaceOptions::builder().upsert(true).build(),
                    session,
                )
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_members(&self, org_id: &str) -> Result<Vec<Member>, StoreError> {
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let cursor = self
            .members()
            .find(doc! { PARENT_FIELD: paths::members_collection(org_id) }, options)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        let members = documents
            .iter()
            .filter_map(|document| match document.get_str("_id") {
                Ok(path) => paths::doc_id(path).map(Member::new),
                Err(_) => {
                    tracing::warn!(org_id = %org_id, "Skipping member document with non-path _id");
                    None
                }
            })
            .collect();

        Ok(members)
    }

    async fn list_payments(&self, due: &DueParams) -> Result<Vec<Document>, StoreError> {
        let filter = doc! { PARENT_FIELD: paths::payments_collection(&due.org_id, &due.due_id) };
        let cursor = self.payments().find(filter, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(strip_metadata).collect())
    }

    async fn commit_payments(
        &self,
        due: &DueParams,
        records: Vec<PaymentRecord>,
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        if let Err(e) = self.write_batch(&mut session, due, &records).await {
            if let Err(abort_err) = session.abort_transaction().await {
                tracing::warn!(due = %due, "Failed to abort payment batch: {}", abort_err);
            }
            return Err(e);
        }

        session.commit_transaction().await?;
        Ok(())
    }

    async fn merge_summary(
        &self,
        due: &DueParams,
        summary: &DueSummary,
    ) -> Result<(), StoreError> {
        let mut fields = summary.merge_fields();
        fields.insert(PARENT_FIELD, paths::meta_collection(&due.org_id, &due.due_id));

        self.meta()
            .update_one(
                doc! { "_id": paths::summary_doc(&due.org_id, &due.due_id) },
                doc! { "$set": fields },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    async fn get_summary(&self, due: &DueParams) -> Result<Option<Document>, StoreError> {
        let summary = self
            .meta()
            .find_one(doc! { "_id": paths::summary_doc(&due.org_id, &due.due_id) }, None)
            .await?;
        Ok(summary.map(strip_metadata))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}
