//! # Number Formats
//!
//! Human-facing business keys for sales.
//!
//! ```text
//! Order number:    ORD 0314 007          {prefix}{MMDD}{seq:03}
//!                  │   │    └── n-th order of the business day
//!                  │   └── month + day
//!                  └── configurable prefix
//!
//! Receipt number:  RC 20260314 482913    {prefix}{YYYYMMDD}{suffix:06}
//!                               └── random, zero-padded
//! ```
//!
//! Formatting is pure; allocation (counting the day's sales, picking the
//! random suffix, retrying on collision) lives in mezze-db.

use chrono::NaiveDate;
use std::ops::RangeInclusive;

/// Default prefix for order numbers.
pub const DEFAULT_ORDER_PREFIX: &str = "ORD";

/// Default prefix for receipt numbers.
pub const DEFAULT_RECEIPT_PREFIX: &str = "RC";

/// Range the random receipt suffix is drawn from.
pub const RECEIPT_SUFFIX_RANGE: RangeInclusive<u32> = 0..=999_999;

/// Formats an order number.
///
/// Sequences above 999 simply widen.
///
/// ```rust
/// use chrono::NaiveDate;
/// use mezze_core::numbering::format_order_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
/// assert_eq!(format_order_number("ORD", day, 7), "ORD0314007");
/// ```
pub fn format_order_number(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}{}{:03}", prefix, date.format("%m%d"), seq)
}

/// Formats a receipt number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use mezze_core::numbering::format_receipt_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
/// assert_eq!(format_receipt_number("RC", day, 42), "RC20260314000042");
/// ```
pub fn format_receipt_number(prefix: &str, date: NaiveDate, suffix: u32) -> String {
    format!("{}{}{:06}", prefix, date.format("%Y%m%d"), suffix)
}

/// Daily sequence for an allocation attempt.
///
/// `existing` is the number of records already created that business day;
/// each retry moves one slot further.
pub const fn daily_sequence(existing: i64, attempt: u32) -> i64 {
    existing + 1 + attempt as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn test_order_number_format() {
        assert_eq!(format_order_number("ORD", day(), 1), "ORD0105001");
        assert_eq!(format_order_number("T", day(), 42), "T0105042");
        assert_eq!(format_order_number("ORD", day(), 1234), "ORD01051234");
    }

    #[test]
    fn test_receipt_number_format() {
        assert_eq!(format_receipt_number("RC", day(), 0), "RC20260105000000");
        assert_eq!(format_receipt_number("RC", day(), 999_999), "RC20260105999999");
    }

    #[test]
    fn test_daily_sequence() {
        assert_eq!(daily_sequence(0, 0), 1);
        assert_eq!(daily_sequence(6, 0), 7);
        assert_eq!(daily_sequence(6, 2), 9);
    }
}
