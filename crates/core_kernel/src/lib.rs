//! Core kernel for the water billing system
//!
//! Shared building blocks used by every other crate: precise money types,
//! strongly-typed identifiers, the billing calendar, and the port
//! infrastructure for external collaborators.

pub mod error;
pub mod identifiers;
pub mod money;
pub mod ports;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{BillId, CustomerId, MeterNumber, MeterNumberError, PaymentId, ReadingId};
pub use money::{Currency, Money, MoneyError, UnitRate};
pub use ports::{DomainPort, PortError};
pub use temporal::{
    format_day_month_year, one_month_after, BillingPeriod, TemporalError,
};
