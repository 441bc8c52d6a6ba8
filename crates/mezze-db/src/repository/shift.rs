//! # Shift Repository
//!
//! Register shifts: open, running totals, X-report, close with cash count.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open(cashier, float) ──▶ OPEN ──────────────────────────▶ CLOSED       │
//! │                            │  ▲                    close(counted)       │
//! │          create_sale ──────┘  │ total_sales += total                    │
//! │                               │ <bucket>    += total                    │
//! │                               │ discount    += discount                 │
//! │                               │ sale_count  += 1                        │
//! │                               │                                         │
//! │          cash purchase pay ───┘ (cash_expenses row, read at close)      │
//! │                                                                         │
//! │  One open shift per cashier (partial UNIQUE index on cashier_id).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, new_id};
use mezze_core::sale::ShiftIncrement;
use mezze_core::shift::{reconcile, CashReconciliation, ShiftSummary, ShiftTotals};
use mezze_core::validation::{optional_text, require_text, validate_non_negative};
use mezze_core::{CoreError, Money, Shift};

const SHIFT_COLUMNS: &str = r#"
    id, cashier_id, opening_balance_cents,
    total_sales_cents, cash_sales_cents, card_sales_cents, credit_sales_cents, foc_sales_cents,
    discount_amount_cents, sale_count, is_closed,
    closing_cash_cents, expected_cash_cents, cash_difference_cents, closing_notes,
    opened_at, closed_at
"#;

/// Result of closing a shift.
#[derive(Debug, Clone)]
pub struct ShiftClose {
    pub shift: Shift,
    pub reconciliation: CashReconciliation,
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Folds a committed sale into an open shift with one atomic UPDATE.
///
/// A closed or unknown shift is `CoreError::ShiftNotOpen`.
pub(crate) async fn apply_sale(
    conn: &mut SqliteConnection,
    shift_id: &str,
    inc: &ShiftIncrement,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE shifts SET
            total_sales_cents = total_sales_cents + ?1,
            cash_sales_cents = cash_sales_cents + ?2,
            card_sales_cents = card_sales_cents + ?3,
            credit_sales_cents = credit_sales_cents + ?4,
            foc_sales_cents = foc_sales_cents + ?5,
            discount_amount_cents = discount_amount_cents + ?6,
            sale_count = sale_count + 1
        WHERE id = ?7 AND is_closed = 0
        "#,
    )
    .bind(inc.total_sales.cents())
    .bind(inc.cash_sales.cents())
    .bind(inc.card_sales.cents())
    .bind(inc.credit_sales.cents())
    .bind(inc.foc_sales.cents())
    .bind(inc.discount.cents())
    .bind(shift_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ShiftNotOpen(shift_id.to_string()).into());
    }

    Ok(())
}

/// Fails with `ShiftNotOpen` unless `shift_id` is an open shift.
pub(crate) async fn ensure_open(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<()> {
    let open: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM shifts WHERE id = ?1 AND is_closed = 0")
            .bind(shift_id)
            .fetch_optional(&mut *conn)
            .await?;

    match open {
        Some(_) => Ok(()),
        None => Err(CoreError::ShiftNotOpen(shift_id.to_string()).into()),
    }
}

/// Records cash taken out of the drawer.
pub(crate) async fn record_cash_expense(
    conn: &mut SqliteConnection,
    shift_id: Option<&str>,
    purchase_id: &str,
    amount: Money,
    description: &str,
    actor_id: &str,
) -> DbResult<()> {
    if let Some(shift_id) = shift_id {
        ensure_open(conn, shift_id).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO cash_expenses (
            id, shift_id, purchase_id, amount_cents, description, actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(new_id())
    .bind(shift_id)
    .bind(purchase_id)
    .bind(amount.cents())
    .bind(description)
    .bind(actor_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn cash_out(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<Money> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM cash_expenses WHERE shift_id = ?1",
    )
    .bind(shift_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_cents(total))
}

async fn fetch_shift(conn: &mut SqliteConnection, shift_id: &str) -> DbResult<Shift> {
    let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?1");
    sqlx::query_as::<_, Shift>(&sql)
        .bind(shift_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Shift", shift_id))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for register shifts.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a shift for a cashier with a starting float.
    ///
    /// ## Errors
    /// * `CoreError::ShiftAlreadyOpen` - the cashier already has one open
    pub async fn open(&self, cashier_id: &str, opening_balance_cents: i64) -> DbResult<Shift> {
        let cashier_id = require_text("cashier_id", Some(cashier_id))?;
        validate_non_negative("opening_balance", opening_balance_cents)?;

        let shift = Shift {
            id: new_id(),
            cashier_id,
            opening_balance_cents,
            total_sales_cents: 0,
            cash_sales_cents: 0,
            card_sales_cents: 0,
            credit_sales_cents: 0,
            foc_sales_cents: 0,
            discount_amount_cents: 0,
            sale_count: 0,
            is_closed: false,
            closing_cash_cents: None,
            expected_cash_cents: None,
            cash_difference_cents: None,
            closing_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO shifts (id, cashier_id, opening_balance_cents, is_closed, opened_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.cashier_id)
        .bind(shift.opening_balance_cents)
        .bind(shift.opened_at)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            let err = DbError::from(e);
            if err.is_unique_violation_on("shifts.cashier_id") {
                let existing = self
                    .find_open(&shift.cashier_id)
                    .await?
                    .map(|s| s.id)
                    .unwrap_or_default();
                return Err(CoreError::ShiftAlreadyOpen {
                    cashier_id: shift.cashier_id,
                    shift_id: existing,
                }
                .into());
            }
            return Err(err);
        }

        info!(
            shift_id = %shift.id,
            cashier_id = %shift.cashier_id,
            opening = %Money::from_cents(opening_balance_cents),
            "Shift opened"
        );

        Ok(shift)
    }

    /// The cashier's open shift, if any.
    pub async fn find_open(&self, cashier_id: &str) -> DbResult<Option<Shift>> {
        let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE cashier_id = ?1 AND is_closed = 0");
        let shift = sqlx::query_as::<_, Shift>(&sql)
            .bind(cashier_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// Gets a shift by ID.
    pub async fn get(&self, shift_id: &str) -> DbResult<Option<Shift>> {
        let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?1");
        let shift = sqlx::query_as::<_, Shift>(&sql)
            .bind(shift_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// X-report: running totals and expected drawer cash, without closing.
    pub async fn summary(&self, shift_id: &str) -> DbResult<ShiftSummary> {
        let mut conn = self.pool.acquire().await?;
        let shift = fetch_shift(&mut conn, shift_id).await?;
        let cash_out = cash_out(&mut conn, shift_id).await?;

        Ok(ShiftSummary::from_shift(&shift, cash_out))
    }

    /// Closes a shift against the physically counted cash.
    ///
    /// ```text
    /// expected   = opening + cash_sales − Σ cash_expenses(shift)
    /// difference = counted − expected
    /// ```
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown shift
    /// * `CoreError::ShiftNotOpen` - already closed
    pub async fn close(
        &self,
        shift_id: &str,
        counted_cash_cents: i64,
        notes: Option<&str>,
    ) -> DbResult<ShiftClose> {
        validate_non_negative("counted_cash", counted_cash_cents)?;

        let mut tx = begin_write(&self.pool).await?;

        let shift = fetch_shift(&mut tx, shift_id).await?;
        if shift.is_closed {
            return Err(CoreError::ShiftNotOpen(shift_id.to_string()).into());
        }

        let cash_out = cash_out(&mut tx, shift_id).await?;
        let reconciliation = reconcile(
            shift.opening_balance(),
            shift.cash_sales(),
            cash_out,
            Money::from_cents(counted_cash_cents),
        );

        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                is_closed = 1,
                closing_cash_cents = ?1,
                expected_cash_cents = ?2,
                cash_difference_cents = ?3,
                closing_notes = ?4,
                closed_at = ?5
            WHERE id = ?6 AND is_closed = 0
            "#,
        )
        .bind(counted_cash_cents)
        .bind(reconciliation.expected_cash.cents())
        .bind(reconciliation.difference.cents())
        .bind(optional_text(notes))
        .bind(Utc::now())
        .bind(shift_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ShiftNotOpen(shift_id.to_string()).into());
        }

        let closed = fetch_shift(&mut tx, shift_id).await?;
        tx.commit().await?;

        if reconciliation.difference.is_zero() {
            info!(shift_id, expected = %reconciliation.expected_cash, "Shift closed, drawer balanced");
        } else {
            warn!(
                shift_id,
                expected = %reconciliation.expected_cash,
                counted = %reconciliation.counted_cash,
                difference = %reconciliation.difference,
                "Shift closed with cash difference"
            );
        }

        Ok(ShiftClose {
            shift: closed,
            reconciliation,
        })
    }

    /// Re-sums a shift's totals straight from its sales.
    ///
    /// Compare with [`ShiftTotals::recorded`] to audit the running totals.
    pub async fn recompute_totals(&self, shift_id: &str) -> DbResult<ShiftTotals> {
        let row: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(total_cents), 0),
                COALESCE(SUM(CASE WHEN payment_method IN ('CASH', 'CASH_ON_DELIVERY')
                                  THEN total_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN payment_method = 'CARD' THEN total_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN payment_method = 'CREDIT' THEN total_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN payment_method = 'FOC' THEN total_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN discount_cents > 0 THEN discount_cents ELSE 0 END), 0),
                COUNT(*)
            FROM sales
            WHERE shift_id = ?1
            "#,
        )
        .bind(shift_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ShiftTotals {
            total_sales: Money::from_cents(row.0),
            cash_sales: Money::from_cents(row.1),
            card_sales: Money::from_cents(row.2),
            credit_sales: Money::from_cents(row.3),
            foc_sales: Money::from_cents(row.4),
            discounts: Money::from_cents(row.5),
            sale_count: row.6,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_open_and_find() {
        let db = test_db().await;
        let shift = db.shifts().open("cashier-1", 20_000).await.unwrap();

        assert!(!shift.is_closed);
        assert_eq!(shift.opening_balance_cents, 20_000);

        let found = db.shifts().find_open("cashier-1").await.unwrap().unwrap();
        assert_eq!(found.id, shift.id);
        assert!(db.shifts().find_open("cashier-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_open_shift_per_cashier() {
        let db = test_db().await;
        let first = db.shifts().open("cashier-1", 0).await.unwrap();

        let err = db.shifts().open("cashier-1", 0).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::ShiftAlreadyOpen { shift_id, .. }) => {
                assert_eq!(shift_id, first.id)
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // A different cashier is fine, and so is reopening after close.
        db.shifts().open("cashier-2", 0).await.unwrap();
        db.shifts().close(&first.id, 0, None).await.unwrap();
        db.shifts().open("cashier-1", 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_without_sales() {
        let db = test_db().await;
        let shift = db.shifts().open("cashier-1", 15_000).await.unwrap();

        let closed = db
            .shifts()
            .close(&shift.id, 14_900, Some("  short a coin "))
            .await
            .unwrap();

        assert!(closed.shift.is_closed);
        assert!(closed.shift.closed_at.is_some());
        assert_eq!(closed.shift.expected_cash_cents, Some(15_000));
        assert_eq!(closed.shift.cash_difference_cents, Some(-100));
        assert_eq!(closed.shift.closing_notes.as_deref(), Some("short a coin"));
        assert_eq!(closed.reconciliation.difference.cents(), -100);
    }

    #[tokio::test]
    async fn test_close_twice_rejected() {
        let db = test_db().await;
        let shift = db.shifts().open("cashier-1", 0).await.unwrap();
        db.shifts().close(&shift.id, 0, None).await.unwrap();

        let err = db.shifts().close(&shift.id, 0, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShiftNotOpen(_))));

        let err = db.shifts().close("missing", 0, None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_apply_sale_to_closed_shift_fails() {
        let db = test_db().await;
        let shift = db.shifts().open("cashier-1", 0).await.unwrap();
        db.shifts().close(&shift.id, 0, None).await.unwrap();

        let inc = ShiftIncrement {
            total_sales: Money::from_cents(100),
            cash_sales: Money::from_cents(100),
            card_sales: Money::zero(),
            credit_sales: Money::zero(),
            foc_sales: Money::zero(),
            discount: Money::zero(),
        };
        let mut conn = db.pool().acquire().await.unwrap();
        let err = apply_sale(&mut conn, &shift.id, &inc).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShiftNotOpen(_))));
    }

    #[tokio::test]
    async fn test_summary_of_fresh_shift() {
        let db = test_db().await;
        let shift = db.shifts().open("cashier-1", 5_000).await.unwrap();

        let summary = db.shifts().summary(&shift.id).await.unwrap();
        assert_eq!(summary.expected_cash.cents(), 5_000);
        assert_eq!(summary.sale_count, 0);

        let totals = db.shifts().recompute_totals(&shift.id).await.unwrap();
        assert_eq!(totals, ShiftTotals::default());
    }
}
