//! Billing calendar tests

use chrono::NaiveDate;
use core_kernel::temporal::{
    format_day_month_year, one_month_after, BillingPeriod, TemporalError,
};

#[test]
fn test_period_ordering_follows_calendar() {
    let earlier = BillingPeriod::new(2026, 7).unwrap();
    let later = BillingPeriod::new(2026, 8).unwrap();
    assert!(earlier < later);
    assert!(BillingPeriod::new(2025, 12).unwrap() < earlier);
}

#[test]
fn test_period_parse_rejects_garbage() {
    assert!(matches!(
        "202608".parse::<BillingPeriod>(),
        Err(TemporalError::InvalidPeriod(_))
    ));
    assert!(matches!(
        "2026-00".parse::<BillingPeriod>(),
        Err(TemporalError::InvalidMonth(0))
    ));
}

#[test]
fn test_due_date_is_one_month_out() {
    let bill_date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
    let due = one_month_after(bill_date).unwrap();
    assert_eq!(due, NaiveDate::from_ymd_opt(2026, 9, 5).unwrap());
}

#[test]
fn test_due_date_leap_february() {
    let bill_date = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
    let due = one_month_after(bill_date).unwrap();
    assert_eq!(due, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
}

#[test]
fn test_due_date_format_matches_notification_style() {
    let due = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
    assert_eq!(format_day_month_year(due), "05 Sep 2026");
}
