//! Customer SMS notification text
//!
//! Single producer of the billing message. Downstream systems parse this
//! text, so the wording and field order must stay stable.

use core_kernel::{format_day_month_year, UnitRate};
use rust_decimal::Decimal;

use crate::bill::Bill;

/// Renders the SMS sent after a bill is issued
///
/// The message carries the customer's full name, the billing period label,
/// the amount due, the reading snapshot, the charge line
/// (`consumption x rate = charge`), and the due date as `DD Mon YYYY`.
pub fn bill_notification(customer_name: &str, bill: &Bill) -> String {
    let rate = UnitRate::new(effective_rate(bill), bill.water_charge.currency());

    format!(
        "Dear {name}, your water bill for {period} is {total}. \
         Previous reading: {previous}, current reading: {current}. \
         {consumption} units x {rate} = {charge}. \
         Pay by {due}. Thank you.",
        name = customer_name,
        period = bill.billing_period.label(),
        total = bill.total_amount,
        previous = bill.previous_reading,
        current = bill.current_reading,
        consumption = bill.consumption,
        rate = rate,
        charge = bill.water_charge,
        due = format_day_month_year(bill.due_date),
    )
}

/// Effective per-unit rate for the charge line
///
/// Recovered from the bill so the message always matches what was billed,
/// even if the configured tariff changes later.
fn effective_rate(bill: &Bill) -> Decimal {
    if bill.consumption.is_zero() {
        Decimal::ZERO
    } else {
        (bill.water_charge.amount() / bill.consumption)
            .round_dp(2)
            .normalize()
    }
}
