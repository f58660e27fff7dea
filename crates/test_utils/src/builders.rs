//! Builder patterns for test data construction
//!
//! Builders start from sensible defaults and let tests override only the
//! fields under test.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, MeterNumber, Money, UnitRate};
use domain_billing::{Bill, Customer, MeterReading, ReadingMethod};

/// Builder for `Customer` test instances
#[derive(Debug, Clone)]
pub struct CustomerBuilder {
    meter_number: String,
    full_name: String,
    phone: String,
    zone: Option<String>,
    rate_per_unit: Decimal,
    currency: Currency,
    initial_reading: Decimal,
    balance: Option<Decimal>,
}

impl Default for CustomerBuilder {
    fn default() -> Self {
        Self {
            meter_number: "WM-0042".to_string(),
            full_name: "Grace Wanjiku".to_string(),
            phone: "+254700000042".to_string(),
            zone: None,
            rate_per_unit: dec!(100),
            currency: Currency::KES,
            initial_reading: dec!(100.0),
            balance: None,
        }
    }
}

impl CustomerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meter_number(mut self, meter_number: impl Into<String>) -> Self {
        self.meter_number = meter_number.into();
        self
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn rate_per_unit(mut self, rate: Decimal) -> Self {
        self.rate_per_unit = rate;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn initial_reading(mut self, reading: Decimal) -> Self {
        self.initial_reading = reading;
        self
    }

    /// Overrides the signed balance (negative = arrears)
    pub fn balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn build(self) -> Customer {
        let mut customer = Customer::new(
            MeterNumber::new(&self.meter_number).expect("valid test meter number"),
            self.full_name,
            self.phone,
            UnitRate::new(self.rate_per_unit, self.currency),
            self.initial_reading,
        );
        if let Some(zone) = self.zone {
            customer = customer.with_zone(zone);
        }
        if let Some(balance) = self.balance {
            customer.balance = Money::new(balance, self.currency);
        }
        customer
    }
}

/// Builder producing a validated reading and its bill for a customer
#[derive(Debug, Clone)]
pub struct SubmissionBuilder {
    current_reading: Decimal,
    read_by: String,
    method: ReadingMethod,
    reading_date: DateTime<Utc>,
}

impl Default for SubmissionBuilder {
    fn default() -> Self {
        Self {
            current_reading: dec!(150.0),
            read_by: "reader-7".to_string(),
            method: ReadingMethod::Manual,
            reading_date: Utc.with_ymd_and_hms(2026, 8, 5, 9, 0, 0).unwrap(),
        }
    }
}

impl SubmissionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_reading(mut self, reading: Decimal) -> Self {
        self.current_reading = reading;
        self
    }

    pub fn read_by(mut self, read_by: impl Into<String>) -> Self {
        self.read_by = read_by.into();
        self
    }

    pub fn method(mut self, method: ReadingMethod) -> Self {
        self.method = method;
        self
    }

    pub fn reading_date(mut self, date: DateTime<Utc>) -> Self {
        self.reading_date = date;
        self
    }

    /// Builds the reading and bill as the engine would for this customer
    pub fn build_for(self, customer: &Customer) -> (MeterReading, Bill) {
        let reading = MeterReading::compute(
            customer.meter_number.clone(),
            customer.last_reading,
            self.current_reading,
            customer.rate_per_unit,
            self.read_by,
            self.method,
            self.reading_date,
        )
        .expect("valid test reading");
        let bill = Bill::issue(customer, &reading, customer.arrears()).expect("valid test bill");
        (reading, bill)
    }
}
