//! Billing DTOs
//!
//! Wire shapes for the reading-submission and payment endpoints. Amounts
//! and readings come in as JSON numbers and are normalized to two decimal
//! places before they reach the engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{Bill, BillStatus, Payment, PaymentMethod, PaymentStatus, ReadingMethod};

/// Request body for `POST /api/v1/readings`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReadingRequest {
    /// Meter number of the customer being billed
    #[validate(length(min = 1, max = 32))]
    pub meter_number: String,
    /// New cumulative meter position
    pub current_reading: Decimal,
    /// When the meter was read; defaults to now
    pub reading_date: Option<DateTime<Utc>>,
    /// Who captured the reading
    #[validate(length(min = 1))]
    pub read_by: String,
    /// Capture method; defaults to `manual`
    pub method: Option<ReadingMethod>,
}

/// Request body for `POST /api/v1/payments`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    /// Bill being paid
    pub bill_id: Uuid,
    /// Payment amount
    pub amount: Decimal,
    /// Payment method
    pub method: PaymentMethod,
    /// External transaction reference, if any
    pub transaction_reference: Option<String>,
    /// Collector-issued receipt number; generated when absent
    pub receipt_number: Option<String>,
    /// Who collected the payment
    #[validate(length(min = 1))]
    pub collected_by: String,
}

/// Bill representation returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillResponse {
    pub id: Uuid,
    pub bill_number: String,
    pub meter_number: String,
    pub billing_period: String,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub consumption: Decimal,
    pub water_charge: Decimal,
    pub arrears: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub currency: String,
    pub status: BillStatus,
    pub bill_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notification_sent: bool,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        Self {
            id: bill.id.into(),
            bill_number: bill.bill_number,
            meter_number: bill.meter_number.to_string(),
            billing_period: bill.billing_period.label(),
            previous_reading: bill.previous_reading,
            current_reading: bill.current_reading,
            consumption: bill.consumption,
            water_charge: bill.water_charge.amount(),
            arrears: bill.arrears.amount(),
            total_amount: bill.total_amount.amount(),
            amount_paid: bill.amount_paid.amount(),
            balance: bill.balance.amount(),
            currency: bill.total_amount.currency().code().to_string(),
            status: bill.status,
            bill_date: bill.bill_date,
            due_date: bill.due_date,
            notification_sent: bill.notification_sent,
        }
    }
}

/// Payment confirmation returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub receipt_number: String,
    pub transaction_reference: Option<String>,
    pub collected_by: String,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.into(),
            bill_id: payment.bill_id.into(),
            amount: payment.amount.amount(),
            currency: payment.amount.currency().code().to_string(),
            method: payment.method,
            receipt_number: payment.receipt_number,
            transaction_reference: payment.transaction_reference,
            collected_by: payment.collected_by,
            status: payment.status,
            paid_at: payment.paid_at,
        }
    }
}
