//! Billing domain ports
//!
//! The billing engine reaches its two external collaborators through the
//! traits defined here:
//!
//! - **`LedgerStore`**: the persistent collections (customers, readings,
//!   bills, payments) plus the all-or-nothing write units the engine
//!   commits through.
//! - **`SmsGateway`**: outbound text messages; transport is somebody
//!   else's problem, the port only reports delivery outcome.
//!
//! Adapters implement these traits: `infra_db` provides the PostgreSQL
//! `LedgerStore`, and the `mock` submodule provides in-memory versions for
//! tests.
//!
//! # Atomicity contract
//!
//! `record_submission` and `record_payment` group their writes into one
//! unit: all become visible together or not at all, with read-your-writes
//! consistency inside the unit. `record_submission` additionally enforces a
//! compare-and-swap on the customer's `last_reading` (expected value =
//! `reading.previous_reading`); a mismatch aborts the unit with
//! `PortError::Conflict` so that two racing submissions can never bill the
//! same consumption interval twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{BillId, DomainPort, MeterNumber, PortError};

use crate::bill::Bill;
use crate::customer::Customer;
use crate::payment::Payment;
use crate::reading::MeterReading;

/// Persistent ledger collections and atomic write units
#[async_trait]
pub trait LedgerStore: DomainPort {
    /// Inserts a customer record
    ///
    /// Onboarding happens outside the billing core; the store still has to
    /// accept the record so deployments and tests can seed accounts.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), PortError>;

    /// Looks up a customer by meter number
    async fn customer_by_meter(&self, meter_number: &MeterNumber) -> Result<Customer, PortError>;

    /// Returns the most recent reading for a meter, if any
    async fn latest_reading(
        &self,
        meter_number: &MeterNumber,
    ) -> Result<Option<MeterReading>, PortError>;

    /// Looks up a bill by id
    async fn bill_by_id(&self, id: BillId) -> Result<Bill, PortError>;

    /// Returns all payments recorded against a bill
    async fn payments_for_bill(&self, id: BillId) -> Result<Vec<Payment>, PortError>;

    /// Commits a reading submission as one atomic unit
    ///
    /// Inserts the reading, inserts the bill, and applies the customer
    /// update (`last_reading`, `last_reading_date`, `total_consumed`,
    /// `balance`). The customer update is guarded by a compare-and-swap on
    /// `last_reading == reading.previous_reading`.
    ///
    /// # Errors
    ///
    /// - `PortError::NotFound` when the customer vanished
    /// - `PortError::Conflict` when the compare-and-swap lost a race;
    ///   nothing was written
    async fn record_submission(&self, reading: &MeterReading, bill: &Bill)
        -> Result<(), PortError>;

    /// Commits a payment as one atomic unit
    ///
    /// Inserts the payment, advances the bill's paid amount, balance, and
    /// status, and applies the customer update (`balance`, `total_paid`).
    /// Returns the updated bill.
    async fn record_payment(&self, payment: &Payment) -> Result<Bill, PortError>;

    /// Flags a bill's notification as delivered
    ///
    /// Called from the asynchronous notification path after the gateway
    /// reports success; failure here is logged by the caller, never
    /// propagated to the billing request.
    async fn mark_bill_notified(
        &self,
        bill_id: BillId,
        sent_at: DateTime<Utc>,
    ) -> Result<(), PortError>;
}

/// Outbound text-message gateway
#[async_trait]
pub trait SmsGateway: DomainPort {
    /// Sends a text message to a phone number
    async fn send(&self, phone: &str, message: &str) -> Result<(), PortError>;
}

/// In-memory adapters for testing
///
/// `MemoryLedgerStore` keeps the four collections behind one write lock so
/// each unit commits atomically with respect to concurrent readers, and
/// enforces the same compare-and-swap as the PostgreSQL adapter.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct LedgerState {
        customers: HashMap<MeterNumber, Customer>,
        readings: Vec<MeterReading>,
        bills: HashMap<BillId, Bill>,
        payments: Vec<Payment>,
    }

    /// In-memory implementation of `LedgerStore`
    #[derive(Debug, Clone, Default)]
    pub struct MemoryLedgerStore {
        state: Arc<RwLock<LedgerState>>,
    }

    impl MemoryLedgerStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates the store with customers
        pub async fn with_customers(customers: Vec<Customer>) -> Self {
            let store = Self::new();
            {
                let mut state = store.state.write().await;
                for customer in customers {
                    state
                        .customers
                        .insert(customer.meter_number.clone(), customer);
                }
            }
            store
        }

        /// Number of readings held (test inspection)
        pub async fn reading_count(&self) -> usize {
            self.state.read().await.readings.len()
        }

        /// All bills held, unordered (test inspection)
        pub async fn all_bills(&self) -> Vec<Bill> {
            self.state.read().await.bills.values().cloned().collect()
        }
    }

    impl DomainPort for MemoryLedgerStore {}

    #[async_trait]
    impl LedgerStore for MemoryLedgerStore {
        async fn insert_customer(&self, customer: &Customer) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.customers.contains_key(&customer.meter_number) {
                return Err(PortError::conflict(format!(
                    "customer already exists for meter {}",
                    customer.meter_number
                )));
            }
            state
                .customers
                .insert(customer.meter_number.clone(), customer.clone());
            Ok(())
        }

        async fn customer_by_meter(
            &self,
            meter_number: &MeterNumber,
        ) -> Result<Customer, PortError> {
            self.state
                .read()
                .await
                .customers
                .get(meter_number)
                .cloned()
                .ok_or_else(|| PortError::not_found("Customer", meter_number))
        }

        async fn latest_reading(
            &self,
            meter_number: &MeterNumber,
        ) -> Result<Option<MeterReading>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .readings
                .iter()
                .rev()
                .find(|r| r.meter_number == *meter_number)
                .cloned())
        }

        async fn bill_by_id(&self, id: BillId) -> Result<Bill, PortError> {
            self.state
                .read()
                .await
                .bills
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Bill", id))
        }

        async fn payments_for_bill(&self, id: BillId) -> Result<Vec<Payment>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .payments
                .iter()
                .filter(|p| p.bill_id == id)
                .cloned()
                .collect())
        }

        async fn record_submission(
            &self,
            reading: &MeterReading,
            bill: &Bill,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;

            let customer = state
                .customers
                .get_mut(&reading.meter_number)
                .ok_or_else(|| PortError::not_found("Customer", &reading.meter_number))?;

            // Compare-and-swap: the baseline this submission was computed
            // from must still be the customer's current position.
            if customer.last_reading != reading.previous_reading {
                return Err(PortError::conflict(format!(
                    "last_reading moved to {} while submission was computed from {}",
                    customer.last_reading, reading.previous_reading
                )));
            }

            customer.apply_submission(reading, bill);
            state.readings.push(reading.clone());
            state.bills.insert(bill.id, bill.clone());
            Ok(())
        }

        async fn record_payment(&self, payment: &Payment) -> Result<Bill, PortError> {
            let mut state = self.state.write().await;

            let bill = state
                .bills
                .get_mut(&payment.bill_id)
                .ok_or_else(|| PortError::not_found("Bill", payment.bill_id))?;
            bill.record_payment(payment.amount);
            let updated = bill.clone();

            let customer = state
                .customers
                .get_mut(&payment.meter_number)
                .ok_or_else(|| PortError::not_found("Customer", &payment.meter_number))?;
            customer.apply_payment(payment.amount);

            state.payments.push(payment.clone());
            Ok(updated)
        }

        async fn mark_bill_notified(
            &self,
            bill_id: BillId,
            sent_at: DateTime<Utc>,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let bill = state
                .bills
                .get_mut(&bill_id)
                .ok_or_else(|| PortError::not_found("Bill", bill_id))?;
            bill.mark_notified(sent_at);
            Ok(())
        }
    }

    /// A delivered mock message
    #[derive(Debug, Clone)]
    pub struct SentSms {
        pub phone: String,
        pub message: String,
    }

    /// In-memory implementation of `SmsGateway`
    ///
    /// Records delivered messages and can be armed to fail every send.
    #[derive(Debug, Default)]
    pub struct MockSmsGateway {
        sent: Mutex<Vec<SentSms>>,
        failing: AtomicBool,
    }

    impl MockSmsGateway {
        /// Creates a gateway that delivers everything
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a gateway that fails every send
        pub fn failing() -> Self {
            let gateway = Self::default();
            gateway.failing.store(true, Ordering::SeqCst);
            gateway
        }

        /// Arms or disarms failure mode
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Messages delivered so far
        pub fn sent(&self) -> Vec<SentSms> {
            self.sent.lock().expect("sms mock lock poisoned").clone()
        }
    }

    impl DomainPort for MockSmsGateway {}

    #[async_trait]
    impl SmsGateway for MockSmsGateway {
        async fn send(&self, phone: &str, message: &str) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "sms".to_string(),
                });
            }
            self.sent
                .lock()
                .expect("sms mock lock poisoned")
                .push(SentSms {
                    phone: phone.to_string(),
                    message: message.to_string(),
                });
            Ok(())
        }
    }
}
