//! # Numbering Service
//!
//! Allocates order and receipt numbers inside the caller's transaction.
//!
//! ## Allocate-Insert-Retry
//! ```text
//! attempt 0:  preferred number (e.g. from a resumed held order), if any
//!             otherwise  {prefix}{MMDD}{count_today + 1}
//!      │
//!      ▼
//! parked on a held cart / already on a sale?  (the other table)
//!      │  yes ──▶ skip to the next candidate
//!      ▼
//! INSERT ... (UNIQUE order_number, UNIQUE receipt_number)
//!      │
//!      ├── ok ─────────────────────────────────────────────▶ done
//!      │
//!      └── UNIQUE violation on a number column
//!             │  (SQLite rolls back the statement, not the transaction)
//!             ▼
//!          next generated sequence + fresh receipt suffix
//!             │
//!             └── ... up to max_attempts, then TransactionFailed
//! ```

use chrono::NaiveDate;
use rand::Rng;
use sqlx::SqliteConnection;

use crate::error::DbResult;
use mezze_core::numbering::{
    daily_sequence, format_order_number, format_receipt_number, DEFAULT_ORDER_PREFIX,
    DEFAULT_RECEIPT_PREFIX, RECEIPT_SUFFIX_RANGE,
};

/// Number formats and the collision retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingConfig {
    pub order_prefix: String,
    pub receipt_prefix: String,
    /// Attempts before giving up on a colliding number. At least 1.
    pub max_attempts: u32,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        NumberingConfig {
            order_prefix: DEFAULT_ORDER_PREFIX.to_string(),
            receipt_prefix: DEFAULT_RECEIPT_PREFIX.to_string(),
            max_attempts: 5,
        }
    }
}

impl NumberingConfig {
    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Random receipt number for `date`.
    pub(crate) fn receipt_number(&self, date: NaiveDate) -> String {
        let suffix = rand::thread_rng().gen_range(RECEIPT_SUFFIX_RANGE);
        format_receipt_number(&self.receipt_prefix, date, suffix)
    }
}

/// Hands out order-number candidates: the preferred number first, then the
/// day's sequence.
#[derive(Debug)]
pub(crate) struct OrderNumbers<'a> {
    config: &'a NumberingConfig,
    date: NaiveDate,
    existing: i64,
    preferred: Option<String>,
    generated: u32,
}

impl<'a> OrderNumbers<'a> {
    pub(crate) fn new(
        config: &'a NumberingConfig,
        date: NaiveDate,
        existing: i64,
        preferred: Option<String>,
    ) -> Self {
        OrderNumbers {
            config,
            date,
            existing,
            preferred,
            generated: 0,
        }
    }

    /// Next candidate. The bool is true when it is the preferred number.
    pub(crate) fn next_candidate(&mut self) -> (String, bool) {
        if let Some(preferred) = self.preferred.take() {
            return (preferred, true);
        }
        let seq = daily_sequence(self.existing, self.generated);
        self.generated += 1;
        (
            format_order_number(&self.config.order_prefix, self.date, seq),
            false,
        )
    }
}

/// Sales recorded on `date` plus carts currently parked.
///
/// Sales and held orders draw from the same daily sequence.
pub(crate) async fn count_orders_on(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM sales WHERE business_date = ?1) \
              + (SELECT COUNT(*) FROM held_orders)",
    )
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Whether a parked cart currently carries `order_number`.
pub(crate) async fn is_held(conn: &mut SqliteConnection, order_number: &str) -> DbResult<bool> {
    let held: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM held_orders WHERE order_number = ?1)")
            .bind(order_number)
            .fetch_one(&mut *conn)
            .await?;

    Ok(held)
}

/// Whether a settled sale already carries `order_number`.
pub(crate) async fn is_sold(conn: &mut SqliteConnection, order_number: &str) -> DbResult<bool> {
    let sold: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales WHERE order_number = ?1)")
        .bind(order_number)
        .fetch_one(&mut *conn)
        .await?;

    Ok(sold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn test_preferred_number_comes_first() {
        let config = NumberingConfig::default();
        let mut numbers = OrderNumbers::new(&config, day(), 4, Some("ORD0314002".to_string()));

        assert_eq!(numbers.next_candidate(), ("ORD0314002".to_string(), true));
        assert_eq!(numbers.next_candidate(), ("ORD0314005".to_string(), false));
        assert_eq!(numbers.next_candidate(), ("ORD0314006".to_string(), false));
    }

    #[test]
    fn test_generated_sequence_and_prefix() {
        let config = NumberingConfig {
            order_prefix: "MZ".to_string(),
            ..NumberingConfig::default()
        };
        let mut numbers = OrderNumbers::new(&config, day(), 0, None);
        assert_eq!(numbers.next_candidate().0, "MZ0314001");
    }

    #[test]
    fn test_receipt_number_shape() {
        let receipt = NumberingConfig::default().receipt_number(day());
        assert!(receipt.starts_with("RC20260314"));
        assert_eq!(receipt.len(), "RC20260314".len() + 6);
        assert!(receipt["RC20260314".len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_attempts_never_zero() {
        let config = NumberingConfig {
            max_attempts: 0,
            ..NumberingConfig::default()
        };
        assert_eq!(config.attempts(), 1);
    }
}
