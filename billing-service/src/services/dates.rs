//! Billing date arithmetic.
//!
//! Pure functions; everything temporal in the billing engine is derived
//! from these so the policy lives in one place.

use chrono::{Duration, Months, NaiveDate};

/// Months between successive invoices for a subscription.
pub const BILLING_PERIOD_MONTHS: u32 = 1;

/// Days between an invoice's issue date and its due date.
pub const PAYMENT_TERMS_DAYS: i64 = 15;

/// Days before the due date at which a pending invoice gets a reminder.
pub const REMINDER_LEAD_DAYS: i64 = 3;

/// Next billing date after `current`: plus `months` calendar months.
///
/// `Months` addition clamps to the last day of the target month, so
/// Jan 31 + 1 month is Feb 29 in a leap year and Feb 28 otherwise.
pub fn next_billing_date(current: NaiveDate, months: u32) -> NaiveDate {
    current + Months::new(months)
}

/// Due date for an invoice issued on `issue_date`.
pub fn due_date(issue_date: NaiveDate, days: i64) -> NaiveDate {
    issue_date + Duration::days(days)
}

/// Due date selected by the reminder sweep running on `today`: pending
/// invoices due exactly this far out get their one advance notice.
pub fn reminder_target(today: NaiveDate) -> NaiveDate {
    today + Duration::days(REMINDER_LEAD_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_billing_date_plain_month() {
        assert_eq!(next_billing_date(date(2024, 3, 10), 1), date(2024, 4, 10));
    }

    #[test]
    fn test_next_billing_date_clamps_to_leap_february() {
        assert_eq!(next_billing_date(date(2024, 1, 31), 1), date(2024, 2, 29));
    }

    #[test]
    fn test_next_billing_date_clamps_to_short_february() {
        assert_eq!(next_billing_date(date(2023, 1, 31), 1), date(2023, 2, 28));
    }

    #[test]
    fn test_next_billing_date_clamps_thirty_day_month() {
        assert_eq!(next_billing_date(date(2024, 3, 31), 1), date(2024, 4, 30));
    }

    #[test]
    fn test_next_billing_date_year_rollover() {
        assert_eq!(next_billing_date(date(2024, 12, 15), 1), date(2025, 1, 15));
    }

    #[test]
    fn test_due_date_payment_terms() {
        assert_eq!(
            due_date(date(2024, 3, 10), PAYMENT_TERMS_DAYS),
            date(2024, 3, 25)
        );
    }

    #[test]
    fn test_due_date_crosses_month_boundary() {
        assert_eq!(
            due_date(date(2024, 2, 20), PAYMENT_TERMS_DAYS),
            date(2024, 3, 6)
        );
    }

    #[test]
    fn test_reminder_target() {
        assert_eq!(reminder_target(date(2024, 3, 22)), date(2024, 3, 25));
    }
}
