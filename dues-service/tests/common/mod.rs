#![allow(dead_code)]

use dues_service::paths::{self, DueParams, PaymentParams};
use dues_service::services::InMemoryStore;
use dues_service::triggers::{TriggerEvent, TriggerRouter};
use mongodb::bson::{doc, DateTime, Document};
use std::sync::Arc;

pub const TEST_ORG_ID: &str = "org1";
pub const TEST_DUE_ID: &str = "due1";

pub struct TestStore {
    pub store: InMemoryStore,
    pub router: TriggerRouter,
}

impl TestStore {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let router = TriggerRouter::new(Arc::new(store.clone()));
        Self { store, router }
    }

    pub async fn add_members(&self, org_id: &str, uids: &[&str]) {
        for uid in uids {
            self.store
                .put(paths::member_doc(org_id, uid), doc! { "role": "member" })
                .await;
        }
    }

    /// Store a due and return the creation event the store would raise.
    pub async fn create_due(&self, org_id: &str, due_id: &str, data: Document) -> TriggerEvent {
        self.store
            .put(paths::due_doc(org_id, due_id), data.clone())
            .await;
        TriggerEvent::due_created(DueParams::new(org_id, due_id), Some(data))
    }

    /// Set `paidAt` on a member's record and return the resulting write event.
    pub async fn mark_paid(&self, org_id: &str, due_id: &str, uid: &str) -> TriggerEvent {
        self.update_payment(
            org_id,
            due_id,
            uid,
            doc! { "paidAt": DateTime::now(), "transactionId": format!("txn_{}", uid) },
        )
        .await
    }

    pub async fn update_payment(
        &self,
        org_id: &str,
        due_id: &str,
        uid: &str,
        fields: Document,
    ) -> TriggerEvent {
        let path = paths::payment_doc(org_id, due_id, uid);
        let before = self.store.get(&path).await;
        assert!(
            self.store.update(&path, fields).await,
            "payment record {} does not exist",
            path
        );
        let after = self.store.get(&path).await;
        TriggerEvent::payment_written(PaymentParams::new(org_id, due_id, uid), before, after)
    }

    pub async fn payments(&self, org_id: &str, due_id: &str) -> Vec<(String, Document)> {
        self.store
            .list(&paths::payments_collection(org_id, due_id))
            .await
    }

    pub async fn summary(&self, org_id: &str, due_id: &str) -> Option<Document> {
        self.store.get(&paths::summary_doc(org_id, due_id)).await
    }
}
