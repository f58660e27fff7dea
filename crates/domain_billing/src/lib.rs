//! Billing domain for the water utility
//!
//! This crate holds the transaction core: entities (`Customer`,
//! `MeterReading`, `Bill`, `Payment`), the ports to the ledger store and
//! the SMS gateway, and the `BillingEngine` that orchestrates reading
//! submission and payment capture under an atomic-unit discipline.
//!
//! # Flow
//!
//! ```text
//! submit_reading ──> resolve customer + previous reading
//!                ──> compute consumption, charge, arrears, total
//!                ──> LedgerStore::record_submission (atomic, CAS-guarded)
//!                ──> spawn SMS notification (best-effort)
//!
//! record_payment ──> validate amount, resolve bill
//!                ──> LedgerStore::record_payment (atomic)
//! ```

pub mod bill;
pub mod customer;
pub mod engine;
pub mod error;
pub mod notification;
pub mod payment;
pub mod ports;
pub mod reading;

pub use bill::{Bill, BillStatus};
pub use customer::Customer;
pub use engine::{
    BillingConfig, BillingEngine, OverpaymentPolicy, RecordPayment, SubmitReading,
};
pub use error::BillingError;
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use reading::{MeterReading, ReadingMethod};
