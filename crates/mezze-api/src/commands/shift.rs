//! # Shift Commands
//!
//! ```text
//! open_shift ──► sales fold in ──► shift_summary (X-report, any time)
//!                                        │
//!                                        ▼
//!                         close_shift(counted cash) ──► difference
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::PosEngine;
use crate::outcome::Outcome;
use mezze_core::shift::{ShiftSummary, ShiftTotals};
use mezze_core::{Actor, Shift};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftResponse {
    pub shift_id: String,
    pub opening_balance_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentShiftResponse {
    pub shift: Option<Shift>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftResponse {
    pub shift_id: String,
    pub total_sales_cents: i64,
    pub cash_sales_cents: i64,
    pub expected_cash_cents: i64,
    pub counted_cash_cents: i64,
    /// Counted minus expected: negative when the drawer is short.
    pub difference_cents: i64,
}

pub async fn open_shift(
    engine: &PosEngine,
    actor: &Actor,
    opening_balance_cents: i64,
) -> Outcome<OpenShiftResponse> {
    debug!(cashier = %actor.id, opening_balance_cents, "open_shift command");

    engine
        .db()
        .shifts()
        .open(&actor.id, opening_balance_cents)
        .await
        .map(|shift| OpenShiftResponse {
            shift_id: shift.id,
            opening_balance_cents: shift.opening_balance_cents,
        })
        .into()
}

/// The actor's open shift, if any.
pub async fn current_shift(engine: &PosEngine, actor: &Actor) -> Outcome<CurrentShiftResponse> {
    engine
        .db()
        .shifts()
        .find_open(&actor.id)
        .await
        .map(|shift| CurrentShiftResponse { shift })
        .into()
}

/// X-report: running totals and expected drawer cash without closing.
pub async fn shift_summary(engine: &PosEngine, shift_id: &str) -> Outcome<ShiftSummary> {
    engine.db().shifts().summary(shift_id).await.into()
}

/// Closes the shift against the physically counted cash.
pub async fn close_shift(
    engine: &PosEngine,
    shift_id: &str,
    counted_cash_cents: i64,
    notes: Option<&str>,
) -> Outcome<CloseShiftResponse> {
    debug!(shift_id, counted_cash_cents, "close_shift command");

    engine
        .db()
        .shifts()
        .close(shift_id, counted_cash_cents, notes)
        .await
        .map(|closed| {
            let difference = closed.reconciliation.difference;
            if !difference.is_zero() {
                warn!(shift_id, difference = %difference, "Drawer does not match expected cash");
            }
            info!(shift_id, "Shift closed");

            CloseShiftResponse {
                shift_id: closed.shift.id,
                total_sales_cents: closed.shift.total_sales_cents,
                cash_sales_cents: closed.shift.cash_sales_cents,
                expected_cash_cents: closed.reconciliation.expected_cash.cents(),
                counted_cash_cents: closed.reconciliation.counted_cash.cents(),
                difference_cents: difference.cents(),
            }
        })
        .into()
}

/// Totals re-summed from the shift's committed sales, for auditing the
/// running aggregates.
pub async fn recompute_shift_totals(engine: &PosEngine, shift_id: &str) -> Outcome<ShiftTotals> {
    engine.db().shifts().recompute_totals(shift_id).await.into()
}
