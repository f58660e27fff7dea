//! Pre-built test data for common entities
//!
//! Fixtures use `fake` for realistic names and phone numbers while keeping
//! the billing-relevant fields deterministic.

use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, UnitRate};
use domain_billing::Customer;

use crate::builders::CustomerBuilder;

/// The flat tariff used across the fixture data
pub fn standard_rate() -> UnitRate {
    UnitRate::new(dec!(100), Currency::KES)
}

/// A customer with a fresh account at meter position 100
pub fn fresh_customer() -> Customer {
    CustomerBuilder::new().build()
}

/// A customer carrying arrears of the given magnitude
pub fn customer_in_arrears(arrears: Decimal) -> Customer {
    CustomerBuilder::new().balance(-arrears).build()
}

/// A customer with randomized identity fields and the given meter number
pub fn random_customer(meter_number: &str) -> Customer {
    CustomerBuilder::new()
        .meter_number(meter_number)
        .full_name(Name().fake::<String>())
        .phone(PhoneNumber().fake::<String>())
        .build()
}

/// A batch of customers with distinct sequential meter numbers
pub fn customer_batch(count: usize) -> Vec<Customer> {
    (0..count)
        .map(|i| random_customer(&format!("WM-{:04}", 1000 + i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_customer_has_no_arrears() {
        assert!(fresh_customer().arrears().is_zero());
    }

    #[test]
    fn test_customer_in_arrears() {
        let customer = customer_in_arrears(dec!(5000));
        assert_eq!(customer.arrears().amount(), dec!(5000));
        assert_eq!(customer.balance.amount(), dec!(-5000));
    }

    #[test]
    fn test_customer_batch_has_unique_meters() {
        let batch = customer_batch(5);
        let mut meters: Vec<_> = batch.iter().map(|c| c.meter_number.clone()).collect();
        meters.dedup();
        assert_eq!(meters.len(), 5);
    }
}
