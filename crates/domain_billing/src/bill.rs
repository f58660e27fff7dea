//! Bill generation and payment accounting
//!
//! One bill is issued per committed reading (1:1). A bill accumulates
//! payments but is never deleted; its status walks
//! `pending -> partially_paid -> paid`, with `overdue` flagged past the
//! due date.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{
    one_month_after, BillId, BillingPeriod, CustomerId, MeterNumber, Money, ReadingId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::customer::Customer;
use crate::error::BillingError;
use crate::reading::MeterReading;

/// Bill status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Issued, no payment received
    Pending,
    /// Partial payment received
    PartiallyPaid,
    /// Fully paid
    Paid,
    /// Past due date with a balance outstanding
    Overdue,
}

/// A bill generated from a single meter reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier
    pub id: BillId,
    /// Human-readable bill number: `BILL-<meterNumber>-<YYYYMM>`
    pub bill_number: String,
    /// The reading this bill was generated from
    pub reading_id: ReadingId,
    /// Customer being billed
    pub customer_id: CustomerId,
    /// Meter the bill belongs to
    pub meter_number: MeterNumber,
    /// Billing period
    pub billing_period: BillingPeriod,
    /// Reading snapshot
    pub previous_reading: Decimal,
    /// Reading snapshot
    pub current_reading: Decimal,
    /// Consumed volume
    pub consumption: Decimal,
    /// Charge for the consumed volume
    pub water_charge: Money,
    /// Arrears carried forward from the customer's balance
    pub arrears: Money,
    /// Total due: water charge + arrears, half-up to 2 dp
    pub total_amount: Money,
    /// Payments received so far
    pub amount_paid: Money,
    /// Remaining balance: total - paid
    pub balance: Money,
    /// Status
    pub status: BillStatus,
    /// Issue date
    pub bill_date: NaiveDate,
    /// Due date (one month after issue)
    pub due_date: NaiveDate,
    /// Whether the SMS notification was delivered
    pub notification_sent: bool,
    /// When the notification was delivered
    pub notification_sent_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Issues a bill for a computed reading
    ///
    /// # Arguments
    ///
    /// * `customer` - The account being billed (pre-submission state)
    /// * `reading` - The validated reading record
    /// * `arrears` - Outstanding arrears carried onto this bill
    pub fn issue(
        customer: &Customer,
        reading: &MeterReading,
        arrears: Money,
    ) -> Result<Self, BillingError> {
        let bill_date = reading.reading_date.date_naive();
        let due_date = one_month_after(bill_date)
            .map_err(|e| BillingError::Calculation(e.to_string()))?;

        let total_amount = reading
            .water_charge
            .checked_add(&arrears)
            .map_err(|e| BillingError::Calculation(e.to_string()))?
            .round_half_up(2);

        let now = Utc::now();

        Ok(Self {
            id: BillId::new_v7(),
            bill_number: Self::bill_number_for(&reading.meter_number, reading.billing_period),
            reading_id: reading.id,
            customer_id: customer.id,
            meter_number: reading.meter_number.clone(),
            billing_period: reading.billing_period,
            previous_reading: reading.previous_reading,
            current_reading: reading.current_reading,
            consumption: reading.consumption,
            water_charge: reading.water_charge,
            arrears,
            total_amount,
            amount_paid: Money::zero(total_amount.currency()),
            balance: total_amount,
            status: BillStatus::Pending,
            bill_date,
            due_date,
            notification_sent: false,
            notification_sent_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// The persisted bill number format: `BILL-<meterNumber>-<YYYYMM>`
    pub fn bill_number_for(meter_number: &MeterNumber, period: BillingPeriod) -> String {
        format!("BILL-{}-{}", meter_number, period.compact())
    }

    /// Records a payment against the bill and advances its status
    pub fn record_payment(&mut self, amount: Money) {
        self.amount_paid = self.amount_paid + amount;
        self.balance = self.total_amount - self.amount_paid;
        self.updated_at = Utc::now();

        if !self.balance.is_positive() {
            self.status = BillStatus::Paid;
        } else if self.amount_paid.is_positive() {
            self.status = BillStatus::PartiallyPaid;
        }
    }

    /// Returns the outstanding balance
    pub fn balance_due(&self) -> Money {
        self.balance
    }

    /// True when the due date has passed and a balance remains
    pub fn is_overdue(&self) -> bool {
        let today = Utc::now().date_naive();
        today > self.due_date && !matches!(self.status, BillStatus::Paid)
    }

    /// Flags the bill as overdue
    pub fn mark_overdue(&mut self) {
        if self.is_overdue() {
            self.status = BillStatus::Overdue;
            self.updated_at = Utc::now();
        }
    }

    /// Records successful delivery of the customer notification
    pub fn mark_notified(&mut self, sent_at: DateTime<Utc>) {
        self.notification_sent = true;
        self.notification_sent_at = Some(sent_at);
        self.updated_at = Utc::now();
    }
}
