//! Custom test assertions
//!
//! Specialized assertion helpers for domain types that give more
//! meaningful error messages than standard assertions.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_billing::{Bill, Customer, Payment};

/// Asserts that a Money value equals the expected amount
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money mismatch: actual={} {}, expected={}",
        actual.currency(),
        actual.amount(),
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts the customer's signed balance
pub fn assert_balance(customer: &Customer, expected: Decimal) {
    assert_eq!(
        customer.balance.amount(),
        expected,
        "Balance mismatch for meter {}: actual={}, expected={}",
        customer.meter_number,
        customer.balance.amount(),
        expected
    );
}

/// Asserts that recorded payments reconcile with the bill's paid amount
///
/// This is the cross-entity invariant: the sum of payment amounts against
/// a bill must equal the bill's `amount_paid`.
pub fn assert_payments_reconcile(payments: &[Payment], bill: &Bill) {
    let total: Decimal = payments.iter().map(|p| p.amount.amount()).sum();
    assert_eq!(
        total,
        bill.amount_paid.amount(),
        "Payments ({}) do not reconcile with bill {} amount_paid ({})",
        total,
        bill.bill_number,
        bill.amount_paid.amount()
    );
}

/// Asserts that a bill's internal amounts are consistent
pub fn assert_bill_consistent(bill: &Bill) {
    assert_eq!(
        bill.total_amount.amount(),
        (bill.water_charge + bill.arrears).amount(),
        "Bill {} total does not equal water_charge + arrears",
        bill.bill_number
    );
    assert_eq!(
        bill.balance.amount(),
        (bill.total_amount - bill.amount_paid).amount(),
        "Bill {} balance does not equal total - paid",
        bill.bill_number
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{CustomerBuilder, SubmissionBuilder};
    use rust_decimal_macros::dec;

    #[test]
    fn test_bill_consistency_assertion_passes_for_issued_bill() {
        let customer = CustomerBuilder::new().balance(dec!(-5000)).build();
        let (_, bill) = SubmissionBuilder::new()
            .current_reading(dec!(130.0))
            .build_for(&customer);

        assert_bill_consistent(&bill);
        assert_money_eq(&bill.total_amount, dec!(8000.00));
    }

    #[test]
    #[should_panic(expected = "Balance mismatch")]
    fn test_balance_assertion_panics_on_mismatch() {
        let customer = CustomerBuilder::new().build();
        assert_balance(&customer, dec!(-1));
    }
}
