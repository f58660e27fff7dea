//! Billing domain errors

use core_kernel::{BillId, MeterNumber, PortError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the billing domain
///
/// Validation failures abort before any write begins; storage failures
/// abort the whole atomic unit, so every error here leaves the ledger
/// exactly as it was.
#[derive(Debug, Error)]
pub enum BillingError {
    /// No customer exists for the given meter number
    #[error("Customer not found for meter {0}")]
    CustomerNotFound(MeterNumber),

    /// The referenced bill does not exist
    #[error("Bill not found: {0}")]
    BillNotFound(BillId),

    /// The submitted reading is below the customer's previous reading
    #[error("Invalid reading: current {current} is below previous {previous}")]
    InvalidReading { current: Decimal, previous: Decimal },

    /// The payment amount is not positive
    #[error("Invalid payment amount: {0} (must be greater than zero)")]
    InvalidAmount(Decimal),

    /// The payment exceeds the bill's outstanding balance and the engine
    /// is configured to reject overpayment
    #[error("Payment of {amount} exceeds outstanding balance {outstanding}")]
    Overpayment {
        amount: Decimal,
        outstanding: Decimal,
    },

    /// Another submission for the same meter committed first; the caller
    /// may retry the whole operation
    #[error("Concurrent submission detected for meter {0}")]
    ConcurrentSubmission(MeterNumber),

    /// Charge or date computation failed
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// The ledger store failed; the atomic unit was rolled back
    #[error("Storage error: {0}")]
    Storage(#[source] PortError),
}

impl BillingError {
    /// Returns true if retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::ConcurrentSubmission(_) => true,
            BillingError::Storage(port) => port.is_transient(),
            _ => false,
        }
    }
}
