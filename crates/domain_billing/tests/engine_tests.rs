//! Billing engine tests against the in-memory port adapters

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BillId, Currency, MeterNumber, UnitRate};
use domain_billing::ports::mock::{MemoryLedgerStore, MockSmsGateway};
use domain_billing::ports::LedgerStore;
use domain_billing::{
    BillStatus, BillingConfig, BillingEngine, BillingError, Customer, OverpaymentPolicy,
    PaymentMethod, ReadingMethod, RecordPayment, SubmitReading,
};

fn meter() -> MeterNumber {
    MeterNumber::new("WM-0042").unwrap()
}

fn customer_with_initial(initial: Decimal) -> Customer {
    Customer::new(
        meter(),
        "Grace Wanjiku",
        "+254700000042",
        UnitRate::new(dec!(100), Currency::KES),
        initial,
    )
}

async fn engine_with(
    customers: Vec<Customer>,
    config: BillingConfig,
) -> (BillingEngine, Arc<MemoryLedgerStore>, Arc<MockSmsGateway>) {
    let store = Arc::new(MemoryLedgerStore::with_customers(customers).await);
    let gateway = Arc::new(MockSmsGateway::new());
    let engine = BillingEngine::new(store.clone(), gateway.clone(), config);
    (engine, store, gateway)
}

fn submit(meter_number: &MeterNumber, current: Decimal) -> SubmitReading {
    SubmitReading {
        meter_number: meter_number.clone(),
        current_reading: current,
        reading_date: Utc.with_ymd_and_hms(2026, 8, 5, 9, 0, 0).unwrap(),
        read_by: "reader-7".to_string(),
        method: ReadingMethod::Manual,
    }
}

fn pay(bill_id: BillId, amount: Decimal) -> RecordPayment {
    RecordPayment {
        bill_id,
        amount,
        method: PaymentMethod::MobileMoney,
        transaction_reference: None,
        receipt_number: None,
        collected_by: "agent-3".to_string(),
    }
}

async fn wait_for_messages(gateway: &MockSmsGateway, count: usize) {
    for _ in 0..200 {
        if gateway.sent().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} sms messages, got {}",
        count,
        gateway.sent().len()
    );
}

async fn wait_until_notified(store: &MemoryLedgerStore, bill_id: BillId) {
    for _ in 0..200 {
        if store.bill_by_id(bill_id).await.unwrap().notification_sent {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("bill {} never flagged as notified", bill_id);
}

// ============================================================================
// Reading submission
// ============================================================================

#[tokio::test]
async fn test_first_submission_bills_consumption_at_flat_rate() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;

    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    assert_eq!(bill.consumption, dec!(50.0));
    assert_eq!(bill.water_charge.amount(), dec!(5000.00));
    assert!(bill.arrears.is_zero());
    assert_eq!(bill.total_amount.amount(), dec!(5000.00));
    assert_eq!(bill.status, BillStatus::Pending);

    let customer = store.customer_by_meter(&meter()).await.unwrap();
    assert_eq!(customer.balance.amount(), dec!(-5000.00));
    assert_eq!(customer.last_reading, dec!(150.0));
    assert_eq!(customer.total_consumed, dec!(50.0));
}

#[tokio::test]
async fn test_second_submission_carries_arrears_forward() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;

    engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();
    let bill = engine.submit_reading(submit(&meter(), dec!(180.0))).await.unwrap();

    assert_eq!(bill.consumption, dec!(30.0));
    assert_eq!(bill.water_charge.amount(), dec!(3000.00));
    assert_eq!(bill.arrears.amount(), dec!(5000.00));
    assert_eq!(bill.total_amount.amount(), dec!(8000.00));

    // Arrears rolled into the bill are cleared from the balance: the
    // outstanding amount is exactly the new bill's total.
    let customer = store.customer_by_meter(&meter()).await.unwrap();
    assert_eq!(customer.balance.amount(), dec!(-8000.00));
}

#[tokio::test]
async fn test_previous_reading_comes_from_latest_submission() {
    let (engine, _store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;

    engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();
    let bill = engine.submit_reading(submit(&meter(), dec!(155.5))).await.unwrap();

    assert_eq!(bill.previous_reading, dec!(150.0));
    assert_eq!(bill.consumption, dec!(5.5));
    assert_eq!(bill.water_charge.amount(), dec!(550.00));
}

#[tokio::test]
async fn test_rollback_reading_is_rejected_without_mutation() {
    let (engine, store, gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    let before = store.customer_by_meter(&meter()).await.unwrap();

    let result = engine.submit_reading(submit(&meter(), dec!(90.0))).await;

    assert!(matches!(
        result,
        Err(BillingError::InvalidReading { current, previous })
            if current == dec!(90.0) && previous == dec!(100.0)
    ));

    // Snapshot comparison: no reading, no bill, no customer mutation, no
    // notification.
    assert_eq!(store.reading_count().await, 0);
    assert!(store.all_bills().await.is_empty());
    let after = store.customer_by_meter(&meter()).await.unwrap();
    assert_eq!(after.balance, before.balance);
    assert_eq!(after.last_reading, before.last_reading);
    assert_eq!(after.updated_at, before.updated_at);
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_meter_fails_with_not_found() {
    let (engine, _store, _gateway) = engine_with(vec![], BillingConfig::default()).await;

    let result = engine.submit_reading(submit(&meter(), dec!(150.0))).await;

    assert!(matches!(result, Err(BillingError::CustomerNotFound(m)) if m == meter()));
}

#[tokio::test]
async fn test_submission_error_is_not_retryable_but_conflict_is() {
    let invalid = BillingError::InvalidReading {
        current: dec!(1),
        previous: dec!(2),
    };
    assert!(!invalid.is_retryable());
    assert!(BillingError::ConcurrentSubmission(meter()).is_retryable());
}

// ============================================================================
// Payment capture
// ============================================================================

#[tokio::test]
async fn test_partial_payment_updates_bill_and_customer() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();
    let bill = engine.submit_reading(submit(&meter(), dec!(180.0))).await.unwrap();
    assert_eq!(bill.total_amount.amount(), dec!(8000.00));

    let payment = engine.record_payment(pay(bill.id, dec!(3000))).await.unwrap();

    assert_eq!(payment.amount.amount(), dec!(3000.00));
    assert!(payment.receipt_number.starts_with("RCPT-"));

    let stored = store.bill_by_id(bill.id).await.unwrap();
    assert_eq!(stored.balance.amount(), dec!(5000.00));
    assert_eq!(stored.status, BillStatus::PartiallyPaid);

    let customer = store.customer_by_meter(&meter()).await.unwrap();
    assert_eq!(customer.balance.amount(), dec!(-5000.00));
    assert_eq!(customer.total_paid.amount(), dec!(3000.00));
}

#[tokio::test]
async fn test_full_payment_marks_bill_paid() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    engine.record_payment(pay(bill.id, dec!(5000))).await.unwrap();

    let stored = store.bill_by_id(bill.id).await.unwrap();
    assert!(stored.balance.is_zero());
    assert_eq!(stored.status, BillStatus::Paid);

    let customer = store.customer_by_meter(&meter()).await.unwrap();
    assert!(customer.balance.is_zero());
}

#[tokio::test]
async fn test_payment_sum_matches_amount_paid() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    engine.record_payment(pay(bill.id, dec!(1200))).await.unwrap();
    engine.record_payment(pay(bill.id, dec!(800))).await.unwrap();
    engine.record_payment(pay(bill.id, dec!(3000))).await.unwrap();

    let stored = store.bill_by_id(bill.id).await.unwrap();
    let payments = store.payments_for_bill(bill.id).await.unwrap();
    let total: Decimal = payments.iter().map(|p| p.amount.amount()).sum();

    assert_eq!(payments.len(), 3);
    assert_eq!(total, stored.amount_paid.amount());
    assert_eq!(stored.status, BillStatus::Paid);
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected_before_any_write() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    for amount in [dec!(0), dec!(-50)] {
        let result = engine.record_payment(pay(bill.id, amount)).await;
        assert!(matches!(result, Err(BillingError::InvalidAmount(a)) if a == amount));
    }

    assert!(store.payments_for_bill(bill.id).await.unwrap().is_empty());
    let stored = store.bill_by_id(bill.id).await.unwrap();
    assert_eq!(stored.balance.amount(), dec!(5000.00));
}

#[tokio::test]
async fn test_payment_against_unknown_bill_fails() {
    let (engine, _store, _gateway) = engine_with(vec![], BillingConfig::default()).await;
    let missing = BillId::new_v7();

    let result = engine.record_payment(pay(missing, dec!(100))).await;

    assert!(matches!(result, Err(BillingError::BillNotFound(id)) if id == missing));
}

#[tokio::test]
async fn test_overpayment_allowed_becomes_customer_credit() {
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    engine.record_payment(pay(bill.id, dec!(6000))).await.unwrap();

    let stored = store.bill_by_id(bill.id).await.unwrap();
    assert_eq!(stored.status, BillStatus::Paid);
    assert_eq!(stored.balance.amount(), dec!(-1000.00));

    let customer = store.customer_by_meter(&meter()).await.unwrap();
    assert_eq!(customer.balance.amount(), dec!(1000.00));
}

#[tokio::test]
async fn test_overpayment_rejected_leaves_no_writes() {
    let config = BillingConfig {
        overpayment: OverpaymentPolicy::Reject,
        ..BillingConfig::default()
    };
    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], config).await;
    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    let result = engine.record_payment(pay(bill.id, dec!(6000))).await;

    assert!(matches!(
        result,
        Err(BillingError::Overpayment { amount, outstanding })
            if amount == dec!(6000.00) && outstanding == dec!(5000.00)
    ));
    assert!(store.payments_for_bill(bill.id).await.unwrap().is_empty());
    let stored = store.bill_by_id(bill.id).await.unwrap();
    assert_eq!(stored.status, BillStatus::Pending);
    assert_eq!(stored.balance.amount(), dec!(5000.00));
}

#[tokio::test]
async fn test_collector_receipt_number_is_honored() {
    let (engine, _store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;
    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    let request = RecordPayment {
        receipt_number: Some("OFFICE-000123".to_string()),
        transaction_reference: Some("MPE5X0042".to_string()),
        ..pay(bill.id, dec!(1000))
    };
    let payment = engine.record_payment(request).await.unwrap();

    assert_eq!(payment.receipt_number, "OFFICE-000123");
    assert_eq!(payment.transaction_reference.as_deref(), Some("MPE5X0042"));
}

// ============================================================================
// Notification dispatch
// ============================================================================

#[tokio::test]
async fn test_notification_is_sent_and_flagged() {
    let (engine, store, gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;

    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();
    assert!(!bill.notification_sent);

    wait_for_messages(&gateway, 1).await;
    let sent = gateway.sent();
    assert_eq!(sent[0].phone, "+254700000042");
    assert!(sent[0].message.contains("Grace Wanjiku"));
    assert!(sent[0].message.contains("KSh 5000.00"));

    wait_until_notified(&store, bill.id).await;
}

#[tokio::test]
async fn test_notification_failure_never_fails_the_submission() {
    let store = Arc::new(
        MemoryLedgerStore::with_customers(vec![customer_with_initial(dec!(100.0))]).await,
    );
    let gateway = Arc::new(MockSmsGateway::failing());
    let engine = BillingEngine::new(store.clone(), gateway.clone(), BillingConfig::default());

    let bill = engine.submit_reading(submit(&meter(), dec!(150.0))).await.unwrap();

    // Give the background task time to run and fail.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stored = store.bill_by_id(bill.id).await.unwrap();
    assert!(!stored.notification_sent);
    assert!(stored.notification_sent_at.is_none());
    assert!(gateway.sent().is_empty());

    // The bill itself committed normally.
    assert_eq!(stored.total_amount.amount(), dec!(5000.00));
}

// ============================================================================
// Concurrency
// ============================================================================

/// N concurrent submissions against one meter must partition consumption:
/// each committed bill's interval starts exactly where the previous one
/// ended, and the intervals sum to `final - initial`. Losers of the
/// compare-and-swap retry the whole operation, as the contract prescribes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_partition_consumption() {
    const SUBMITTERS: usize = 4;
    const STEP: Decimal = dec!(10);

    let (engine, store, _gateway) =
        engine_with(vec![customer_with_initial(dec!(100.0))], BillingConfig::default()).await;

    let mut handles = Vec::with_capacity(SUBMITTERS);
    for _ in 0..SUBMITTERS {
        let engine = engine.clone();
        let store = store.clone();
        let meter_number = meter();
        handles.push(tokio::spawn(async move {
            loop {
                let last = store
                    .customer_by_meter(&meter_number)
                    .await
                    .unwrap()
                    .last_reading;
                match engine
                    .submit_reading(submit(&meter_number, last + STEP))
                    .await
                {
                    Ok(bill) => break bill,
                    // Lost the race: retry the whole operation with a
                    // freshly observed baseline.
                    Err(BillingError::ConcurrentSubmission(_)) => continue,
                    Err(BillingError::InvalidReading { .. }) => continue,
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let mut bills = store.all_bills().await;
    assert_eq!(bills.len(), SUBMITTERS);
    bills.sort_by(|a, b| a.previous_reading.cmp(&b.previous_reading));

    // Non-overlapping intervals forming a chain from the initial reading.
    assert_eq!(bills[0].previous_reading, dec!(100.0));
    for pair in bills.windows(2) {
        assert_eq!(pair[1].previous_reading, pair[0].current_reading);
    }

    let total_consumption: Decimal = bills.iter().map(|b| b.consumption).sum();
    let customer = store.customer_by_meter(&meter()).await.unwrap();
    assert_eq!(total_consumption, customer.last_reading - dec!(100.0));
    assert_eq!(customer.last_reading, bills.last().unwrap().current_reading);
    assert_eq!(store.reading_count().await, SUBMITTERS);
}
