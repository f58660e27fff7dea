//! Property-based test data generators
//!
//! Proptest strategies for generating random test data that maintains
//! domain invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating valid meter numbers
pub fn meter_number_strategy() -> impl Strategy<Value = String> {
    (1000u32..9999u32).prop_map(|n| format!("WM-{n}"))
}

/// Strategy for generating cumulative meter positions (3 dp volume units)
pub fn meter_position_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|n| Decimal::new(n, 3))
}

/// Strategy for an ordered (previous, current) reading pair
///
/// Guarantees `current >= previous`, the invariant a valid submission
/// relies on.
pub fn reading_pair_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
    (0i64..100_000_000i64, 0i64..1_000_000i64)
        .prop_map(|(base, delta)| (Decimal::new(base, 3), Decimal::new(base + delta, 3)))
}

/// Strategy for positive payment amounts (2 dp currency units)
pub fn payment_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for per-unit tariff rates
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
}
