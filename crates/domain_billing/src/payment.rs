//! Payment records
//!
//! A payment is an immutable record of one transaction against one bill.
//! Receipt numbers are generated when the collector does not supply one.

use chrono::{DateTime, Utc};
use core_kernel::{BillId, MeterNumber, Money, PaymentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the utility office
    Cash,
    /// Mobile money transfer
    MobileMoney,
    /// Bank transfer
    BankTransfer,
    /// Cheque
    Cheque,
    /// Card payment
    Card,
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment captured successfully
    Completed,
    /// Payment was reversed after capture
    Reversed,
}

/// An immutable record of a single payment transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Bill being paid
    pub bill_id: BillId,
    /// Meter the bill belongs to
    pub meter_number: MeterNumber,
    /// Payment amount (always positive)
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
    /// External transaction reference (mobile money code, bank ref)
    pub transaction_reference: Option<String>,
    /// Receipt number issued to the customer
    pub receipt_number: String,
    /// Who collected the payment
    pub collected_by: String,
    /// Status
    pub status: PaymentStatus,
    /// When the payment was made
    pub paid_at: DateTime<Utc>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new completed payment record
    ///
    /// # Arguments
    ///
    /// * `bill_id` - Bill being paid
    /// * `meter_number` - Meter the bill belongs to
    /// * `amount` - Payment amount
    /// * `method` - Payment method
    /// * `collected_by` - Collector identity
    pub fn new(
        bill_id: BillId,
        meter_number: MeterNumber,
        amount: Money,
        method: PaymentMethod,
        collected_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: PaymentId::new_v7(),
            bill_id,
            meter_number,
            amount,
            method,
            transaction_reference: None,
            receipt_number: generate_receipt_number(),
            collected_by: collected_by.into(),
            status: PaymentStatus::Completed,
            paid_at: now,
            created_at: now,
        }
    }

    /// Sets the external transaction reference
    pub fn with_transaction_reference(mut self, reference: impl Into<String>) -> Self {
        self.transaction_reference = Some(reference.into());
        self
    }

    /// Uses a collector-supplied receipt number instead of a generated one
    pub fn with_receipt_number(mut self, receipt_number: impl Into<String>) -> Self {
        self.receipt_number = receipt_number.into();
        self
    }
}

/// Generates a receipt number: `RCPT-<YYYYMMDD>-<6 hex>`
fn generate_receipt_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("RCPT-{}-{}", date, &suffix[..6].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn test_payment() -> Payment {
        Payment::new(
            BillId::new_v7(),
            MeterNumber::new("WM-0042").unwrap(),
            Money::new(dec!(3000), Currency::KES),
            PaymentMethod::MobileMoney,
            "agent-3",
        )
    }

    #[test]
    fn test_new_payment_is_completed() {
        let payment = test_payment();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.amount.amount(), dec!(3000));
        assert!(payment.transaction_reference.is_none());
    }

    #[test]
    fn test_generated_receipt_number_format() {
        let payment = test_payment();
        let parts: Vec<&str> = payment.receipt_number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "RCPT");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_with_transaction_reference() {
        let payment = test_payment().with_transaction_reference("MPE5X0042");
        assert_eq!(payment.transaction_reference.as_deref(), Some("MPE5X0042"));
    }

    #[test]
    fn test_with_supplied_receipt_number() {
        let payment = test_payment().with_receipt_number("OFFICE-000123");
        assert_eq!(payment.receipt_number, "OFFICE-000123");
    }
}
