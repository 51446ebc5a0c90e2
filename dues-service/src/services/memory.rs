//! In-process document store keyed by full document path.

use super::store::{DocumentStore, StoreError};
use crate::models::{DueSummary, Member, PaymentRecord};
use crate::paths::{self, DueParams};
use async_trait::async_trait;
use mongodb::bson::{self, Bson, DateTime as BsonDateTime, Document};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    documents: Arc<RwLock<BTreeMap<String, Document>>>,
    unavailable: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store operation fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `commit_payments` after its batch is staged but before
    /// anything is applied. Reads keep working.
    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    pub async fn put(&self, path: impl Into<String>, document: Document) {
        self.documents.write().await.insert(path.into(), document);
    }

    /// Merge `fields` into an existing document. Returns false if it is missing.
    pub async fn update(&self, path: &str, fields: Document) -> bool {
        let mut documents = self.documents.write().await;
        match documents.get_mut(path) {
            Some(existing) => {
                for (key, value) in fields {
                    existing.insert(key, value);
                }
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, path: &str) -> Option<Document> {
        self.documents.read().await.get(path).cloned()
    }

    pub async fn delete(&self, path: &str) -> Option<Document> {
        self.documents.write().await.remove(path)
    }

    /// Direct children of a collection path, ordered by path.
    pub async fn list(&self, collection: &str) -> Vec<(String, Document)> {
        let prefix = format!("{}/", collection);
        self.documents
            .read()
            .await
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| paths::parent_of(path) == Some(collection))
            .map(|(path, document)| (path.clone(), document.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_members(&self, org_id: &str) -> Result<Vec<Member>, StoreError> {
        self.check_available()?;
        let members = self
            .list(&paths::members_collection(org_id))
            .await
            .into_iter()
            .filter_map(|(path, _)| paths::doc_id(&path).map(Member::new))
            .collect();
        Ok(members)
    }

    async fn list_payments(&self, due: &DueParams) -> Result<Vec<Document>, StoreError> {
        self.check_available()?;
        let payments = self
            .list(&paths::payments_collection(&due.org_id, &due.due_id))
            .await
            .into_iter()
            .map(|(_, document)| document)
            .collect();
        Ok(payments)
    }

    async fn commit_payments(
        &self,
        due: &DueParams,
        records: Vec<PaymentRecord>,
    ) -> Result<(), StoreError> {
        self.check_available()?;

        let created_at = Bson::DateTime(BsonDateTime::now());
        let mut batch = Vec::with_capacity(records.len());
        for record in &records {
            let mut document = bson::to_document(record)?;
            document.insert("createdAt", created_at.clone());
            batch.push((
                paths::payment_doc(&due.org_id, &due.due_id, &record.id),
                document,
            ));
        }

        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "commit of {} payment records for {} rejected",
                batch.len(),
                due
            )));
        }

        // Single write guard: readers never observe a partial batch.
        let mut documents = self.documents.write().await;
        documents.extend(batch);
        Ok(())
    }

    async fn merge_summary(
        &self,
        due: &DueParams,
        summary: &DueSummary,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let path = paths::summary_doc(&due.org_id, &due.due_id);
        let mut documents = self.documents.write().await;
        let stored = documents.entry(path).or_default();
        for (key, value) in summary.merge_fields() {
            stored.insert(key, value);
        }
        Ok(())
    }

    async fn get_summary(&self, due: &DueParams) -> Result<Option<Document>, StoreError> {
        self.check_available()?;
        Ok(self
            .get(&paths::summary_doc(&due.org_id, &due.due_id))
            .await)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn list_returns_direct_children_only() {
        let store = InMemoryStore::new();
        store.put("organizations/o/members/a", doc! {}).await;
        store.put("organizations/o/members/b", doc! {}).await;
        store.put("organizations/o/members/b/devices/x", doc! {}).await;
        store.put("organizations/o/membersx/c", doc! {}).await;

        let children: Vec<String> = store
            .list("organizations/o/members")
            .await
            .into_iter()
            .map(|(path, _)| path)
            .collect();

        assert_eq!(
            children,
            vec!["organizations/o/members/a", "organizations/o/members/b"]
        );
    }

    #[tokio::test]
    async fn rejected_commit_applies_nothing() {
        let store = InMemoryStore::new();
        let due = DueParams::new("o", "d");
        let records = vec![
            PaymentRecord::unpaid("d", "a", 10.0),
            PaymentRecord::unpaid("d", "b", 10.0),
        ];

        store.fail_next_commit();
        assert!(store.commit_payments(&due, records.clone()).await.is_err());
        assert!(store.is_empty().await);

        store.commit_payments(&due, records).await.unwrap();
        assert_eq!(store.list_payments(&due).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn merge_summary_keeps_foreign_fields() {
        let store = InMemoryStore::new();
        let due = DueParams::new("o", "d");
        store
            .put(paths::summary_doc("o", "d"), doc! { "currency": "INR", "paidCount": 9_i64 })
            .await;

        let summary = DueSummary {
            total_collected: 10.0,
            paid_count: 1,
            total_members: 2,
        };
        store.merge_summary(&due, &summary).await.unwrap();

        let stored = store.get_summary(&due).await.unwrap().unwrap();
        assert_eq!(stored.get_str("currency").unwrap(), "INR");
        assert_eq!(stored.get_i64("paidCount").unwrap(), 1);
        assert_eq!(stored.get_i64("totalMembers").unwrap(), 2);
    }

    #[tokio::test]
    async fn unavailable_store_rejects_batches() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let result = store
            .commit_payments(
                &DueParams::new("o", "d"),
                vec![PaymentRecord::unpaid("d", "u1", 5.0)],
            )
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.is_empty().await);
    }
}
