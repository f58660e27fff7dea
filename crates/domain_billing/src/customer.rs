//! Customer account state
//!
//! The customer record carries the running billing state for one water
//! connection: the cumulative meter position, the signed balance, and the
//! lifetime totals. It is mutated only by the billing engine, never
//! directly by API callers.

use chrono::{DateTime, Utc};
use core_kernel::{CustomerId, MeterNumber, Money, UnitRate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bill::Bill;
use crate::reading::MeterReading;

/// A utility customer identified by their meter number
///
/// `balance` is signed: positive means credit owed to the customer,
/// negative means arrears. `last_reading` is seeded with the initial meter
/// position at onboarding and advanced by every submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier
    pub id: CustomerId,
    /// Immutable business key for the water connection
    pub meter_number: MeterNumber,
    /// Customer full name
    pub full_name: String,
    /// Contact phone number for SMS notifications
    pub phone: String,
    /// Supply zone
    pub zone: Option<String>,
    /// Tariff on record for this customer
    ///
    /// Billing currently charges a flat system-wide rate; this field is
    /// stamped onto readings so per-tariff pricing stays a data change.
    pub rate_per_unit: UnitRate,
    /// Fixed standing charge (always zero in this system)
    pub fixed_charge: Money,
    /// Most recent cumulative meter reading
    pub last_reading: Decimal,
    /// When the most recent reading was taken
    pub last_reading_date: Option<DateTime<Utc>>,
    /// Signed running balance (negative = customer owes)
    pub balance: Money,
    /// Lifetime consumption in volume units
    pub total_consumed: Decimal,
    /// Lifetime payments received
    pub total_paid: Money,
    /// Whether the connection is active
    pub is_active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a new customer with an initial meter position
    ///
    /// # Arguments
    ///
    /// * `meter_number` - Business key for the connection
    /// * `full_name` - Customer name
    /// * `phone` - SMS contact number
    /// * `rate_per_unit` - Tariff on record
    /// * `initial_reading` - Meter position at onboarding
    pub fn new(
        meter_number: MeterNumber,
        full_name: impl Into<String>,
        phone: impl Into<String>,
        rate_per_unit: UnitRate,
        initial_reading: Decimal,
    ) -> Self {
        let now = Utc::now();
        let currency = rate_per_unit.currency();

        Self {
            id: CustomerId::new_v7(),
            meter_number,
            full_name: full_name.into(),
            phone: phone.into(),
            zone: None,
            rate_per_unit,
            fixed_charge: Money::zero(currency),
            last_reading: initial_reading,
            last_reading_date: None,
            balance: Money::zero(currency),
            total_consumed: Decimal::ZERO,
            total_paid: Money::zero(currency),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the supply zone
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Outstanding arrears: the negative part of the balance, as a
    /// non-negative amount carried onto the next bill
    pub fn arrears(&self) -> Money {
        if self.balance.is_negative() {
            self.balance.abs()
        } else {
            Money::zero(self.balance.currency())
        }
    }

    /// Applies a committed reading submission to the account
    ///
    /// Advances the meter position and debits the bill total from the
    /// balance. Arrears rolled into the bill are cleared first so the debt
    /// is not counted twice: after a submission the outstanding amount is
    /// exactly the new bill's total (less any prior credit). Called inside
    /// the store's atomic unit, never on its own.
    pub fn apply_submission(&mut self, reading: &MeterReading, bill: &Bill) {
        self.last_reading = reading.current_reading;
        self.last_reading_date = Some(reading.reading_date);
        self.total_consumed += reading.consumption;
        self.balance = self.balance + bill.arrears - bill.total_amount;
        self.updated_at = Utc::now();
    }

    /// Applies a committed payment to the account
    pub fn apply_payment(&mut self, amount: Money) {
        self.balance = self.balance + amount;
        self.total_paid = self.total_paid + amount;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn test_customer() -> Customer {
        Customer::new(
            MeterNumber::new("WM-0042").unwrap(),
            "Grace Wanjiku",
            "+254700000042",
            UnitRate::new(dec!(100), Currency::KES),
            dec!(100.0),
        )
    }

    #[test]
    fn test_new_customer_starts_clean() {
        let customer = test_customer();
        assert_eq!(customer.last_reading, dec!(100.0));
        assert!(customer.balance.is_zero());
        assert!(customer.fixed_charge.is_zero());
        assert!(customer.last_reading_date.is_none());
        assert!(customer.is_active);
    }

    #[test]
    fn test_arrears_is_zero_for_credit_balance() {
        let mut customer = test_customer();
        customer.balance = Money::new(dec!(250), Currency::KES);
        assert!(customer.arrears().is_zero());
    }

    #[test]
    fn test_arrears_is_negative_part_of_balance() {
        let mut customer = test_customer();
        customer.balance = Money::new(dec!(-5000), Currency::KES);
        assert_eq!(customer.arrears().amount(), dec!(5000));
    }

    #[test]
    fn test_apply_payment_moves_balance_toward_credit() {
        let mut customer = test_customer();
        customer.balance = Money::new(dec!(-8000), Currency::KES);

        customer.apply_payment(Money::new(dec!(3000), Currency::KES));

        assert_eq!(customer.balance.amount(), dec!(-5000));
        assert_eq!(customer.total_paid.amount(), dec!(3000));
    }
}
