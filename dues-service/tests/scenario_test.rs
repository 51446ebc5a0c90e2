mod common;

use common::{TestStore, TEST_DUE_ID, TEST_ORG_ID};
use dues_service::paths::DueParams;
use dues_service::triggers::TriggerEvent;
use mongodb::bson::{doc, Bson, Document};

fn assert_summary(summary: &Document, collected: f64, paid: i64, members: i64) {
    assert_eq!(summary.get_f64("totalCollected").unwrap(), collected);
    assert_eq!(summary.get_i64("paidCount").unwrap(), paid);
    assert_eq!(summary.get_i64("totalMembers").unwrap(), members);
}

#[tokio::test]
async fn members_pay_a_due_over_time() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2", "u3"]).await;

    let created = t
        .create_due(TEST_ORG_ID, TEST_DUE_ID, doc! { "amount": 30, "title": "Dues" })
        .await;
    t.router.route(&created).await.unwrap();

    let payments = t.payments(TEST_ORG_ID, TEST_DUE_ID).await;
    assert_eq!(payments.len(), 3);
    for (_, payment) in &payments {
        assert_eq!(payment.get_f64("amount").unwrap(), 30.0);
        assert_eq!(payment.get("paidAt"), Some(&Bson::Null));
    }

    let paid = t.mark_paid(TEST_ORG_ID, TEST_DUE_ID, "u1").await;
    t.router.route(&paid).await.unwrap();
    let summary = t.summary(TEST_ORG_ID, TEST_DUE_ID).await.unwrap();
    assert_summary(&summary, 30.0, 1, 3);

    let paid = t.mark_paid(TEST_ORG_ID, TEST_DUE_ID, "u2").await;
    t.router.route(&paid).await.unwrap();
    let summary = t.summary(TEST_ORG_ID, TEST_DUE_ID).await.unwrap();
    assert_summary(&summary, 60.0, 2, 3);
}

#[tokio::test]
async fn initial_record_writes_produce_unpaid_summary() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2"]).await;
    let created = t
        .create_due(TEST_ORG_ID, TEST_DUE_ID, doc! { "amount": 15 })
        .await;
    t.router.route(&created).await.unwrap();

    // Each fanned-out record raises its own write event.
    for (path, payment) in t.payments(TEST_ORG_ID, TEST_DUE_ID).await {
        let params = dues_service::paths::PaymentParams::parse(&path).unwrap();
        let event = TriggerEvent::payment_written(params, None, Some(payment));
        t.router.route(&event).await.unwrap();
    }

    let summary = t.summary(TEST_ORG_ID, TEST_DUE_ID).await.unwrap();
    assert_summary(&summary, 0.0, 0, 2);
}

#[tokio::test]
async fn out_of_order_delivery_converges() {
    let t = TestStore::new();
    t.add_members(TEST_ORG_ID, &["u1", "u2"]).await;
    let created = t
        .create_due(TEST_ORG_ID, TEST_DUE_ID, doc! { "amount": 40 })
        .await;
    t.router.route(&created).await.unwrap();

    let first = t.mark_paid(TEST_ORG_ID, TEST_DUE_ID, "u1").await;
    let second = t.mark_paid(TEST_ORG_ID, TEST_DUE_ID, "u2").await;

    // Deliver the later write first, then a duplicate of the earlier one.
    t.router.route(&second).await.unwrap();
    t.router.route(&first).await.unwrap();
    t.router.route(&first).await.unwrap();

    let summary = t.summary(TEST_ORG_ID, TEST_DUE_ID).await.unwrap();
    assert_summary(&summary, 80.0, 2, 2);
}

#[tokio::test]
async fn empty_organization_and_null_snapshot_complete_quietly() {
    let t = TestStore::new();

    let created = t
        .create_due(TEST_ORG_ID, TEST_DUE_ID, doc! { "amount": 30 })
        .await;
    t.router.route(&created).await.unwrap();
    assert!(t.payments(TEST_ORG_ID, TEST_DUE_ID).await.is_empty());

    let before = t.store.len().await;
    let empty = TriggerEvent::due_created(DueParams::new(TEST_ORG_ID, "due2"), None);
    t.router.route(&empty).await.unwrap();
    assert_eq!(t.store.len().await, before);
}
