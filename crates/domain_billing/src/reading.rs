//! Meter reading records
//!
//! A reading is an immutable, append-only fact: once computed and committed
//! it is never updated or deleted. Consumption is derived at construction
//! and can never be negative.

use chrono::{DateTime, Utc};
use core_kernel::{BillingPeriod, MeterNumber, Money, ReadingId, UnitRate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BillingError;

/// How a reading was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMethod {
    /// Read on site by a field officer
    Manual,
    /// Reported by the customer
    SelfReported,
    /// Estimated from consumption history
    Estimated,
}

/// An immutable cumulative meter reading with its derived charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterReading {
    /// Unique identifier
    pub id: ReadingId,
    /// Meter the reading belongs to
    pub meter_number: MeterNumber,
    /// Cumulative position at the previous submission
    pub previous_reading: Decimal,
    /// Cumulative position now
    pub current_reading: Decimal,
    /// Derived consumption (current - previous, never negative)
    pub consumption: Decimal,
    /// Tariff applied when the charge was computed
    pub rate_applied: UnitRate,
    /// Charge for the consumed volume
    pub water_charge: Money,
    /// Billing period derived from the reading date
    pub billing_period: BillingPeriod,
    /// Who captured the reading
    pub read_by: String,
    /// Capture method
    pub method: ReadingMethod,
    /// When the meter was read
    pub reading_date: DateTime<Utc>,
    /// When the record was created
    pub recorded_at: DateTime<Utc>,
}

impl MeterReading {
    /// Computes a reading record from a submission
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidReading` when the current reading is
    /// below the previous one; no record is produced in that case.
    pub fn compute(
        meter_number: MeterNumber,
        previous_reading: Decimal,
        current_reading: Decimal,
        rate: UnitRate,
        read_by: impl Into<String>,
        method: ReadingMethod,
        reading_date: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        if current_reading < previous_reading {
            return Err(BillingError::InvalidReading {
                current: current_reading,
                previous: previous_reading,
            });
        }

        let consumption = current_reading - previous_reading;
        let water_charge = rate.charge(consumption);

        Ok(Self {
            id: ReadingId::new_v7(),
            meter_number,
            previous_reading,
            current_reading,
            consumption,
            rate_applied: rate,
            water_charge,
            billing_period: BillingPeriod::from_date(reading_date.date_naive()),
            read_by: read_by.into(),
            method,
            reading_date,
            recorded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn meter() -> MeterNumber {
        MeterNumber::new("WM-0042").unwrap()
    }

    fn rate() -> UnitRate {
        UnitRate::new(dec!(100), Currency::KES)
    }

    #[test]
    fn test_compute_derives_consumption_and_charge() {
        let date = Utc.with_ymd_and_hms(2026, 8, 5, 9, 30, 0).unwrap();
        let reading = MeterReading::compute(
            meter(),
            dec!(100.0),
            dec!(150.0),
            rate(),
            "reader-7",
            ReadingMethod::Manual,
            date,
        )
        .unwrap();

        assert_eq!(reading.consumption, dec!(50.0));
        assert_eq!(reading.water_charge.amount(), dec!(5000.00));
        assert_eq!(reading.billing_period.label(), "2026-08");
    }

    #[test]
    fn test_compute_allows_zero_consumption() {
        let reading = MeterReading::compute(
            meter(),
            dec!(100.0),
            dec!(100.0),
            rate(),
            "reader-7",
            ReadingMethod::Estimated,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(reading.consumption, dec!(0.0));
        assert!(reading.water_charge.is_zero());
    }

    #[test]
    fn test_compute_rejects_rollback() {
        let result = MeterReading::compute(
            meter(),
            dec!(100.0),
            dec!(90.0),
            rate(),
            "reader-7",
            ReadingMethod::Manual,
            Utc::now(),
        );

        assert!(matches!(
            result,
            Err(BillingError::InvalidReading { current, previous })
                if current == dec!(90.0) && previous == dec!(100.0)
        ));
    }
}
