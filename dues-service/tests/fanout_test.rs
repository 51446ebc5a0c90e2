mod common;

use common::{TestStore, TEST_DUE_ID, TEST_ORG_ID};
use dues_service::models::PaymentRecord;
use dues_service::paths::{self, DueParams};
use dues_service::services::StoreError;
use dues_service::sync::{FanoutHandler, FanoutOutcome};
use mongodb::bson::{self, doc, Bson};
use std::sync::Arc;

fn due() -> DueParams {
    DueParams::new(TEST_ORG_ID, TEST_DUE_ID)
}

#[tokio::test]
async fn creates_one_unpaid_record_per_member() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2", "u3"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    let outcome = handler
        .handle(&due(), Some(&doc! { "amount": 30, "title": "March dues" }))
        .await
        .unwrap();

    assert_eq!(outcome, FanoutOutcome::Created(3));

    let payments = t.payments(TEST_ORG_ID, TEST_DUE_ID).await;
    assert_eq!(payments.len(), 3);

    for (path, document) in payments {
        let uid = paths::doc_id(&path).unwrap().to_string();
        assert!(matches!(document.get("createdAt"), Some(Bson::DateTime(_))));

        let record: PaymentRecord = bson::from_document(document).unwrap();
        assert_eq!(record.id, uid);
        assert_eq!(record.user_id, uid);
        assert_eq!(record.due_id, TEST_DUE_ID);
        assert_eq!(record.amount, 30.0);
        assert_eq!(record.transaction_id, "");
        assert!(record.paid_at.is_none());
    }
}

#[tokio::test]
async fn missing_amount_defaults_to_zero() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    handler
        .handle(&due(), Some(&doc! { "title": "Free event" }))
        .await
        .unwrap();

    for (_, document) in t.payments(TEST_ORG_ID, TEST_DUE_ID).await {
        assert_eq!(document.get_f64("amount").unwrap(), 0.0);
    }
}

#[tokio::test]
async fn falsy_amount_defaults_to_zero() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    handler
        .handle(&due(), Some(&doc! { "amount": Bson::Null }))
        .await
        .unwrap();

    let payments = t.payments(TEST_ORG_ID, TEST_DUE_ID).await;
    assert_eq!(payments[0].1.get_f64("amount").unwrap(), 0.0);
}

#[tokio::test]
async fn organization_without_members_creates_nothing() {
    let t = TestStore::new();
    t.add_members("other-org", &["x1"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    let outcome = handler
        .handle(&due(), Some(&doc! { "amount": 10 }))
        .await
        .unwrap();

    assert_eq!(outcome, FanoutOutcome::Created(0));
    assert!(t.payments(TEST_ORG_ID, TEST_DUE_ID).await.is_empty());
}

#[tokio::test]
async fn null_snapshot_is_a_no_op() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1"]).await;
    // Reads would fail, so a skipped event must not touch the store at all.
    t.store.set_unavailable(true);
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    assert_eq!(
        handler.handle(&due(), None).await.unwrap(),
        FanoutOutcome::Skipped
    );

    t.store.set_unavailable(false);
    assert!(t.payments(TEST_ORG_ID, TEST_DUE_ID).await.is_empty());
}

#[tokio::test]
async fn due_without_fields_fans_out_with_zero_amount() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    let outcome = handler.handle(&due(), Some(&doc! {})).await.unwrap();

    assert_eq!(outcome, FanoutOutcome::Created(2));
    let payments = t.payments(TEST_ORG_ID, TEST_DUE_ID).await;
    assert_eq!(payments.len(), 2);
    for (_, document) in payments {
        assert_eq!(document.get_f64("amount").unwrap(), 0.0);
    }
}

#[tokio::test]
async fn replay_overwrites_instead_of_duplicating() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));
    let data = doc! { "amount": 25.5 };

    handler.handle(&due(), Some(&data)).await.unwrap();
    let first: Vec<PaymentRecord> = records(&t).await;

    handler.handle(&due(), Some(&data)).await.unwrap();
    let second: Vec<PaymentRecord> = records(&t).await;

    assert_eq!(second.len(), 2);
    let strip = |records: Vec<PaymentRecord>| -> Vec<PaymentRecord> {
        records
            .into_iter()
            .map(|mut r| {
                r.created_at = None;
                r
            })
            .collect()
    };
    assert_eq!(strip(first), strip(second));
}

#[tokio::test]
async fn unreadable_members_fail_before_any_write() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2", "u3"]).await;
    t.store.set_unavailable(true);
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    let result = handler.handle(&due(), Some(&doc! { "amount": 30 })).await;

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    t.store.set_unavailable(false);
    assert!(t.payments(TEST_ORG_ID, TEST_DUE_ID).await.is_empty());
}

#[tokio::test]
async fn failed_commit_leaves_no_records() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2", "u3"]).await;
    t.store.fail_next_commit();
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    let result = handler.handle(&due(), Some(&doc! { "amount": 30 })).await;

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
    assert!(t.payments(TEST_ORG_ID, TEST_DUE_ID).await.is_empty());

    // The fault is one-shot; redelivery commits the whole batch.
    let outcome = handler
        .handle(&due(), Some(&doc! { "amount": 30 }))
        .await
        .unwrap();
    assert_eq!(outcome, FanoutOutcome::Created(3));
    assert_eq!(t.payments(TEST_ORG_ID, TEST_DUE_ID).await.len(), 3);
}

#[tokio::test]
async fn members_joining_after_fanout_get_no_record() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2"]).await;
    let handler = FanoutHandler::new(Arc::new(t.store.clone()));

    handler
        .handle(&due(), Some(&doc! { "amount": 30 }))
        .await
        .unwrap();
    t.add_members(TEST_ORG_ID, &["late"]).await;

    let payments = t.payments(TEST_ORG_ID, TEST_DUE_ID).await;
    assert_eq!(payments.len(), 2);
    assert!(t
        .store
        .get(&paths::payment_doc(TEST_ORG_ID, TEST_DUE_ID, "late"))
        .await
        .is_none());
}

async fn records(t: &TestStore) -> Vec<PaymentRecord> {
    t.payments(TEST_ORG_ID, TEST_DUE_ID)
        .await
        .into_iter()
        .map(|(_, document)| bson::from_document(document).unwrap())
        .collect()
}
