//! # Shift Reconciliation
//!
//! Cash-drawer math for X-reports (mid-shift) and Z-reports (close).
//!
//! ```text
//! expected_cash = opening_balance + cash_sales − cash_out
//! difference    = counted_cash − expected_cash
//!
//!   difference > 0  → drawer over
//!   difference < 0  → drawer short
//! ```
//!
//! Card, credit and FOC sales never reach the drawer and are not part of
//! the expected cash.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Shift;

/// Drawer reconciliation for a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashReconciliation {
    pub expected_cash: Money,
    pub counted_cash: Money,
    /// Positive when the drawer is over, negative when short.
    pub difference: Money,
}

/// Expected cash in the drawer.
pub fn expected_cash(opening: Money, cash_sales: Money, cash_out: Money) -> Money {
    opening + cash_sales - cash_out
}

/// Reconciles counted cash against what the drawer should hold.
///
/// ```rust
/// use mezze_core::money::Money;
/// use mezze_core::shift::reconcile;
///
/// let rec = reconcile(
///     Money::from_cents(20_000),
///     Money::from_cents(8_000),
///     Money::from_cents(2_000),
///     Money::from_cents(25_500),
/// );
/// assert_eq!(rec.expected_cash.cents(), 26_000);
/// assert_eq!(rec.difference.cents(), -500);
/// ```
pub fn reconcile(
    opening: Money,
    cash_sales: Money,
    cash_out: Money,
    counted: Money,
) -> CashReconciliation {
    let expected = expected_cash(opening, cash_sales, cash_out);
    CashReconciliation {
        expected_cash: expected,
        counted_cash: counted,
        difference: counted - expected,
    }
}

/// X-report for an open (or closed) shift.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShiftSummary {
    pub shift_id: String,
    pub cashier_id: String,
    pub is_closed: bool,
    pub sale_count: i64,
    pub opening_balance: Money,
    pub total_sales: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub credit_sales: Money,
    pub foc_sales: Money,
    pub discounts: Money,
    pub cash_out: Money,
    pub expected_cash: Money,
}

impl ShiftSummary {
    pub fn from_shift(shift: &Shift, cash_out: Money) -> Self {
        ShiftSummary {
            shift_id: shift.id.clone(),
            cashier_id: shift.cashier_id.clone(),
            is_closed: shift.is_closed,
            sale_count: shift.sale_count,
            opening_balance: shift.opening_balance(),
            total_sales: Money::from_cents(shift.total_sales_cents),
            cash_sales: shift.cash_sales(),
            card_sales: Money::from_cents(shift.card_sales_cents),
            credit_sales: Money::from_cents(shift.credit_sales_cents),
            foc_sales: Money::from_cents(shift.foc_sales_cents),
            discounts: Money::from_cents(shift.discount_amount_cents),
            cash_out,
            expected_cash: expected_cash(shift.opening_balance(), shift.cash_sales(), cash_out),
        }
    }
}

/// Shift aggregates re-summed from committed sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShiftTotals {
    pub total_sales: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub credit_sales: Money,
    pub foc_sales: Money,
    pub discounts: Money,
    pub sale_count: i64,
}

impl ShiftTotals {
    /// The running totals stored on the shift row.
    pub fn recorded(shift: &Shift) -> Self {
        ShiftTotals {
            total_sales: Money::from_cents(shift.total_sales_cents),
            cash_sales: shift.cash_sales(),
            card_sales: Money::from_cents(shift.card_sales_cents),
            credit_sales: Money::from_cents(shift.credit_sales_cents),
            foc_sales: Money::from_cents(shift.foc_sales_cents),
            discounts: Money::from_cents(shift.discount_amount_cents),
            sale_count: shift.sale_count,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_balanced_drawer() {
        let rec = reconcile(
            Money::from_cents(20_000),
            Money::from_cents(8_000),
            Money::from_cents(2_000),
            Money::from_cents(26_000),
        );
        assert_eq!(rec.expected_cash.cents(), 26_000);
        assert_eq!(rec.difference, Money::zero());
    }

    #[test]
    fn test_drawer_over() {
        let rec = reconcile(
            Money::from_cents(10_000),
            Money::zero(),
            Money::zero(),
            Money::from_cents(10_250),
        );
        assert_eq!(rec.difference.cents(), 250);
    }

    #[test]
    fn test_summary_excludes_non_cash_buckets() {
        let shift = Shift {
            id: "s1".to_string(),
            cashier_id: "c1".to_string(),
            opening_balance_cents: 5_000,
            total_sales_cents: 9_000,
            cash_sales_cents: 3_000,
            card_sales_cents: 4_000,
            credit_sales_cents: 1_500,
            foc_sales_cents: 500,
            discount_amount_cents: 200,
            sale_count: 4,
            is_closed: false,
            closing_cash_cents: None,
            expected_cash_cents: None,
            cash_difference_cents: None,
            closing_notes: None,
            opened_at: Utc::now(),
            closed_at: None,
        };
        let summary = ShiftSummary::from_shift(&shift, Money::from_cents(1_000));
        assert_eq!(summary.expected_cash.cents(), 7_000);
        assert_eq!(summary.card_sales.cents(), 4_000);
        assert_eq!(summary.sale_count, 4);

        let recorded = ShiftTotals::recorded(&shift);
        assert_eq!(
            recorded.cash_sales + recorded.card_sales + recorded.credit_sales + recorded.foc_sales,
            recorded.total_sales
        );
    }
}
