//! Billing engine
//!
//! The transaction core: turns a submitted meter reading into one atomic
//! set of mutations (reading + bill + customer update) followed by a
//! best-effort SMS notification, and records payments against bills. All
//! persistence goes through the `LedgerStore` port; the engine itself is
//! pure orchestration plus the charge arithmetic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_kernel::{BillId, Currency, MeterNumber, Money, PortError, UnitRate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bill::Bill;
use crate::customer::Customer;
use crate::error::BillingError;
use crate::notification::bill_notification;
use crate::payment::{Payment, PaymentMethod};
use crate::ports::{LedgerStore, SmsGateway};
use crate::reading::{MeterReading, ReadingMethod};

/// What happens when a payment exceeds the bill's outstanding balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// Accept the payment; the excess becomes customer credit
    Allow,
    /// Reject the payment before any write
    Reject,
}

/// Engine configuration
///
/// The flat per-unit rate is injected here rather than hardcoded, so the
/// engine stays pure and testable. All customers are billed at this rate
/// in the current flat-tariff design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Billing currency
    pub currency: Currency,
    /// Flat charge per consumed volume unit
    pub rate_per_unit: Decimal,
    /// Overpayment handling for `record_payment`
    pub overpayment: OverpaymentPolicy,
}

impl BillingConfig {
    /// The tariff applied to consumption
    pub fn rate(&self) -> UnitRate {
        UnitRate::new(self.rate_per_unit, self.currency)
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::KES,
            rate_per_unit: dec!(100),
            overpayment: OverpaymentPolicy::Allow,
        }
    }
}

/// A reading submission request
#[derive(Debug, Clone)]
pub struct SubmitReading {
    /// Meter being read
    pub meter_number: MeterNumber,
    /// New cumulative meter position
    pub current_reading: Decimal,
    /// When the meter was read
    pub reading_date: DateTime<Utc>,
    /// Who captured the reading
    pub read_by: String,
    /// Capture method
    pub method: ReadingMethod,
}

/// A payment capture request
#[derive(Debug, Clone)]
pub struct RecordPayment {
    /// Bill being paid
    pub bill_id: BillId,
    /// Payment amount
    pub amount: Decimal,
    /// Payment method
    pub method: PaymentMethod,
    /// External transaction reference, if any
    pub transaction_reference: Option<String>,
    /// Collector-issued receipt number; generated when absent
    pub receipt_number: Option<String>,
    /// Who collected the payment
    pub collected_by: String,
}

/// The billing transaction core
///
/// Cloning is cheap: adapters are shared behind `Arc`.
#[derive(Clone)]
pub struct BillingEngine {
    ledger: Arc<dyn LedgerStore>,
    sms: Arc<dyn SmsGateway>,
    config: BillingConfig,
}

impl BillingEngine {
    /// Creates an engine over the given adapters
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        sms: Arc<dyn SmsGateway>,
        config: BillingConfig,
    ) -> Self {
        Self {
            ledger,
            sms,
            config,
        }
    }

    /// Returns the engine configuration
    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Processes a meter reading submission
    ///
    /// Resolves the customer and their previous reading, derives
    /// consumption and charges, and commits the reading, the bill, and the
    /// customer update as one atomic unit. After the commit an SMS
    /// notification is dispatched on a background task; its outcome never
    /// affects the returned result.
    ///
    /// # Errors
    ///
    /// - `CustomerNotFound` when no customer has the meter number
    /// - `InvalidReading` when the reading is below the previous one;
    ///   nothing is written
    /// - `ConcurrentSubmission` when another submission for the same meter
    ///   committed first; the caller may retry the whole operation
    /// - `Storage` for infrastructure failures; the unit was rolled back
    pub async fn submit_reading(&self, request: SubmitReading) -> Result<Bill, BillingError> {
        let customer = self
            .ledger
            .customer_by_meter(&request.meter_number)
            .await
            .map_err(|e| match e {
                PortError::NotFound { .. } => {
                    BillingError::CustomerNotFound(request.meter_number.clone())
                }
                other => BillingError::Storage(other),
            })?;

        // Previous reading: the customer's own last submission, or the
        // initial reading recorded at onboarding if none exists yet.
        let previous_reading = match self
            .ledger
            .latest_reading(&request.meter_number)
            .await
            .map_err(BillingError::Storage)?
        {
            Some(last) => last.current_reading,
            None => customer.last_reading,
        };

        let reading = MeterReading::compute(
            request.meter_number.clone(),
            previous_reading,
            request.current_reading,
            self.config.rate(),
            request.read_by,
            request.method,
            request.reading_date,
        )?;

        let bill = Bill::issue(&customer, &reading, customer.arrears())?;

        self.ledger
            .record_submission(&reading, &bill)
            .await
            .map_err(|e| match e {
                PortError::Conflict { .. } => {
                    BillingError::ConcurrentSubmission(request.meter_number.clone())
                }
                PortError::NotFound { .. } => {
                    BillingError::CustomerNotFound(request.meter_number.clone())
                }
                other => BillingError::Storage(other),
            })?;

        info!(
            bill_number = %bill.bill_number,
            meter = %bill.meter_number,
            consumption = %bill.consumption,
            total = %bill.total_amount,
            "Reading submitted and bill issued"
        );

        self.dispatch_notification(&customer, &bill);

        Ok(bill)
    }

    /// Records a payment against a bill
    ///
    /// Commits the payment record, the bill update, and the customer
    /// update as one atomic unit.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` when the amount is not positive; nothing is
    ///   written
    /// - `BillNotFound` when the bill does not exist
    /// - `Overpayment` when the amount exceeds the outstanding balance and
    ///   the engine is configured to reject overpayment
    /// - `Storage` for infrastructure failures; the unit was rolled back
    pub async fn record_payment(&self, request: RecordPayment) -> Result<Payment, BillingError> {
        if request.amount <= Decimal::ZERO {
            return Err(BillingError::InvalidAmount(request.amount));
        }

        let bill = self
            .ledger
            .bill_by_id(request.bill_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound { .. } => BillingError::BillNotFound(request.bill_id),
                other => BillingError::Storage(other),
            })?;

        let amount =
            Money::new(request.amount, bill.total_amount.currency()).round_half_up(2);

        if self.config.overpayment == OverpaymentPolicy::Reject
            && amount.amount() > bill.balance_due().amount()
        {
            return Err(BillingError::Overpayment {
                amount: amount.amount(),
                outstanding: bill.balance_due().amount(),
            });
        }

        let mut payment = Payment::new(
            request.bill_id,
            bill.meter_number.clone(),
            amount,
            request.method,
            request.collected_by,
        );
        if let Some(reference) = request.transaction_reference {
            payment = payment.with_transaction_reference(reference);
        }
        if let Some(receipt) = request.receipt_number {
            payment = payment.with_receipt_number(receipt);
        }

        let updated_bill = self
            .ledger
            .record_payment(&payment)
            .await
            .map_err(|e| match e {
                PortError::NotFound { .. } => BillingError::BillNotFound(request.bill_id),
                other => BillingError::Storage(other),
            })?;

        debug!(
            receipt = %payment.receipt_number,
            bill_number = %updated_bill.bill_number,
            amount = %payment.amount,
            remaining = %updated_bill.balance,
            "Payment recorded"
        );

        Ok(payment)
    }

    /// Looks up a bill by id
    pub async fn bill(&self, bill_id: BillId) -> Result<Bill, BillingError> {
        self.ledger.bill_by_id(bill_id).await.map_err(|e| match e {
            PortError::NotFound { .. } => BillingError::BillNotFound(bill_id),
            other => BillingError::Storage(other),
        })
    }

    /// Lists the payments recorded against a bill
    pub async fn payments(&self, bill_id: BillId) -> Result<Vec<Payment>, BillingError> {
        // Resolve the bill first so a missing id surfaces as NotFound
        // rather than an empty list.
        self.bill(bill_id).await?;
        self.ledger
            .payments_for_bill(bill_id)
            .await
            .map_err(BillingError::Storage)
    }

    /// Dispatches the bill notification off the request path
    ///
    /// Fire-and-forget: gateway success flags the bill as notified;
    /// gateway failure is logged and the flag stays unset. Neither outcome
    /// reaches the submission caller.
    fn dispatch_notification(&self, customer: &Customer, bill: &Bill) {
        let message = bill_notification(&customer.full_name, bill);
        let phone = customer.phone.clone();
        let bill_id = bill.id;
        let bill_number = bill.bill_number.clone();
        let ledger = Arc::clone(&self.ledger);
        let sms = Arc::clone(&self.sms);

        tokio::spawn(async move {
            match sms.send(&phone, &message).await {
                Ok(()) => {
                    let sent_at = Utc::now();
                    if let Err(error) = ledger.mark_bill_notified(bill_id, sent_at).await {
                        warn!(
                            bill_number = %bill_number,
                            error = %error,
                            "Notification delivered but flag update failed"
                        );
                    } else {
                        debug!(bill_number = %bill_number, "Bill notification delivered");
                    }
                }
                Err(error) => {
                    warn!(
                        bill_number = %bill_number,
                        error = %error,
                        "Bill notification failed; flag left unset"
                    );
                }
            }
        });
    }
}
