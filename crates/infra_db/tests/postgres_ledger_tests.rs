//! PostgreSQL ledger adapter integration tests
//!
//! These run against a disposable Postgres container and are ignored by
//! default; run with `cargo test -p infra_db -- --ignored` on a machine
//! with Docker available.

use chrono::Utc;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money};
use domain_billing::ports::LedgerStore;
use domain_billing::{BillStatus, Payment, PaymentMethod};
use infra_db::PostgresLedgerStore;
use test_utils::assertions::{assert_balance, assert_payments_reconcile};
use test_utils::builders::{CustomerBuilder, SubmissionBuilder};
use test_utils::database::{create_isolated_test_database, TestDatabase};

async fn ledger_store() -> (PostgresLedgerStore, TestDatabase) {
    let db = create_isolated_test_database()
        .await
        .expect("postgres test container");
    let store = PostgresLedgerStore::new(db.pool().clone());
    (store, db)
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn test_submission_payment_and_notification_roundtrip() {
    let (store, _db) = ledger_store().await;
    let customer = CustomerBuilder::new().build();
    store.insert_customer(&customer).await.unwrap();

    // Submission unit
    let (reading, bill) = SubmissionBuilder::new()
        .current_reading(dec!(150.0))
        .build_for(&customer);
    store.record_submission(&reading, &bill).await.unwrap();

    let stored_customer = store
        .customer_by_meter(&customer.meter_number)
        .await
        .unwrap();
    assert_eq!(stored_customer.last_reading, dec!(150.0));
    assert_balance(&stored_customer, dec!(-5000.0000));

    let latest = store
        .latest_reading(&customer.meter_number)
        .await
        .unwrap()
        .expect("reading persisted");
    assert_eq!(latest.consumption, dec!(50.0));
    assert_eq!(latest.billing_period, reading.billing_period);

    // A second unit computed from the stale baseline must lose the CAS.
    let (stale_reading, stale_bill) = SubmissionBuilder::new()
        .current_reading(dec!(140.0))
        .build_for(&customer);
    let conflict = store
        .record_submission(&stale_reading, &stale_bill)
        .await
        .unwrap_err();
    assert!(conflict.is_conflict());
    assert!(store.bill_by_id(stale_bill.id).await.is_err());

    // Payment unit
    let payment = Payment::new(
        bill.id,
        customer.meter_number.clone(),
        Money::new(dec!(3000), Currency::KES),
        PaymentMethod::MobileMoney,
        "agent-3",
    );
    let updated = store.record_payment(&payment).await.unwrap();
    assert_eq!(updated.status, BillStatus::PartiallyPaid);
    assert_eq!(updated.balance.amount(), dec!(2000.0000));

    let after_payment = store
        .customer_by_meter(&customer.meter_number)
        .await
        .unwrap();
    assert_balance(&after_payment, dec!(-2000.0000));
    assert_eq!(after_payment.total_paid.amount(), dec!(3000.0000));

    let payments = store.payments_for_bill(bill.id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_payments_reconcile(&payments, &updated);

    // Notification flag
    store.mark_bill_notified(bill.id, Utc::now()).await.unwrap();
    let notified = store.bill_by_id(bill.id).await.unwrap();
    assert!(notified.notification_sent);
}

#[tokio::test]
#[ignore = "requires a local Docker daemon"]
async fn test_duplicate_meter_number_is_rejected() {
    let (store, _db) = ledger_store().await;
    let customer = CustomerBuilder::new().build();
    store.insert_customer(&customer).await.unwrap();

    let duplicate = CustomerBuilder::new().build();
    let error = store.insert_customer(&duplicate).await.unwrap_err();
    assert!(error.is_conflict());
}
