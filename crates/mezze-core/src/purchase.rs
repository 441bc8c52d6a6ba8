//! # Purchase Drafts
//!
//! Supplier invoice math: line totals, header totals, and the payment
//! status that follows from what has been paid.
//!
//! ## Invoice Lifecycle
//! ```text
//!   create_purchase(paid = 0)      make_payment(40.00)     make_payment(60.00)
//!          │                              │                       │
//!          ▼                              ▼                       ▼
//!   ┌────────────┐                 ┌────────────┐          ┌────────────┐
//!   │   UNPAID   │ ──────────────▶ │  PARTIAL   │ ───────▶ │    PAID    │
//!   │ 0 / 100.00 │                 │ 40 / 100   │          │ 100 / 100  │
//!   └────────────┘                 └────────────┘          └────────────┘
//!                                                                 │
//!                                    make_payment(0.01) ──────────┴──▶ Overpayment
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentStatus, SupplierPaymentMethod};
use crate::validation::{
    optional_text, require, require_text, validate_line_count, validate_non_negative,
    validate_payment_amount, validate_quantity, ValidationResult,
};
use crate::{MAX_AMOUNT_CENTS, MAX_PURCHASE_QUANTITY};

// =============================================================================
// Wire Shape
// =============================================================================

/// Supplier invoice header as sent by the back office.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseHeader {
    pub supplier_id: Option<String>,
    pub invoice_number: Option<String>,
    /// Defaults to the business date when absent.
    #[ts(as = "Option<String>")]
    pub purchase_date: Option<NaiveDate>,
    pub discount_cents: Option<i64>,
    pub paid_amount_cents: Option<i64>,
    /// Required when `paid_amount_cents > 0`.
    pub payment_method: Option<SupplierPaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub unit_cost_cents: Option<i64>,
    pub discount_cents: Option<i64>,
}

impl PurchaseLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_cost_cents: i64) -> Self {
        PurchaseLine {
            product_id: Some(product_id.into()),
            quantity: Some(quantity),
            unit_cost_cents: Some(unit_cost_cents),
            discount_cents: None,
        }
    }
}

// =============================================================================
// Validated Draft
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDraftLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub discount: Money,
    pub line_total: Money,
}

/// A validated supplier invoice with its totals computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDraft {
    pub supplier_id: String,
    pub invoice_number: String,
    pub purchase_date: NaiveDate,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<SupplierPaymentMethod>,
    pub notes: Option<String>,
    pub lines: Vec<PurchaseDraftLine>,
}

impl PurchaseDraft {
    /// Validates an invoice and computes its totals.
    ///
    /// ```text
    /// line_total = quantity × unit_cost − line discount
    /// subtotal   = Σ line_total
    /// total      = subtotal − header discount
    /// status     = PaymentStatus::derive(paid, total)
    /// ```
    ///
    /// `business_date` fills in a missing purchase date.
    pub fn build(
        header: &PurchaseHeader,
        items: &[PurchaseLine],
        business_date: NaiveDate,
    ) -> CoreResult<Self> {
        let supplier_id = require_text("supplier_id", header.supplier_id.as_deref())?;
        let invoice_number = require_text("invoice_number", header.invoice_number.as_deref())?;
        validate_line_count(items.len())?;

        let lines = items
            .iter()
            .enumerate()
            .map(|(i, line)| validate_line(i, line))
            .collect::<ValidationResult<Vec<_>>>()?;

        let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
        let discount = Money::from_cents(header.discount_cents.unwrap_or(0));
        validate_non_negative("discount", discount.cents())?;
        if discount > subtotal {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: subtotal.cents(),
            }
            .into());
        }
        let total = subtotal - discount;

        let paid = Money::from_cents(header.paid_amount_cents.unwrap_or(0));
        validate_non_negative("paid_amount", paid.cents())?;
        if paid > total {
            return Err(CoreError::Overpayment {
                amount: paid.cents(),
                outstanding: total.cents(),
            });
        }
        if paid.is_positive() {
            require("payment_method", header.payment_method)?;
        }

        Ok(PurchaseDraft {
            supplier_id,
            invoice_number,
            purchase_date: header.purchase_date.unwrap_or(business_date),
            subtotal,
            discount,
            total,
            paid,
            payment_status: PaymentStatus::derive(paid, total),
            payment_method: header.payment_method,
            notes: optional_text(header.notes.as_deref()),
            lines,
        })
    }
}

fn validate_line(index: usize, line: &PurchaseLine) -> ValidationResult<PurchaseDraftLine> {
    let field = |name: &str| format!("items[{index}].{name}");

    let product_id = require_text(&field("product_id"), line.product_id.as_deref())?;
    let quantity = require(&field("quantity"), line.quantity)?;
    validate_quantity(&field("quantity"), quantity, MAX_PURCHASE_QUANTITY)?;
    let unit_cost = require(&field("unit_cost"), line.unit_cost_cents)?;
    validate_non_negative(&field("unit_cost"), unit_cost)?;
    let discount = line.discount_cents.unwrap_or(0);
    validate_non_negative(&field("discount"), discount)?;

    let unit_cost = Money::from_cents(unit_cost);
    let gross = unit_cost
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field("unit_cost"),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        })?;
    let discount = Money::from_cents(discount);
    if discount > gross {
        return Err(ValidationError::OutOfRange {
            field: field("discount"),
            min: 0,
            max: gross.cents(),
        });
    }

    Ok(PurchaseDraftLine {
        product_id,
        quantity,
        unit_cost,
        discount,
        line_total: gross - discount,
    })
}

// =============================================================================
// Payments
// =============================================================================

/// Outcome of applying one payment to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentApplication {
    pub new_paid: Money,
    /// Never negative.
    pub remaining: Money,
    pub status: PaymentStatus,
}

/// Applies a payment against an invoice's current paid amount.
///
/// Rejects non-positive amounts and anything beyond the outstanding balance.
///
/// ```rust
/// use mezze_core::money::Money;
/// use mezze_core::purchase::apply_payment;
/// use mezze_core::PaymentStatus;
///
/// let app = apply_payment(Money::zero(), Money::from_cents(10_000), Money::from_cents(4_000)).unwrap();
/// assert_eq!(app.remaining.cents(), 6_000);
/// assert_eq!(app.status, PaymentStatus::Partial);
/// ```
pub fn apply_payment(paid: Money, total: Money, amount: Money) -> CoreResult<PaymentApplication> {
    validate_payment_amount(amount.cents())?;

    let outstanding = (total - paid).floor_zero();
    if amount > outstanding {
        return Err(CoreError::Overpayment {
            amount: amount.cents(),
            outstanding: outstanding.cents(),
        });
    }

    let new_paid = paid + amount;
    Ok(PaymentApplication {
        new_paid,
        remaining: (total - new_paid).floor_zero(),
        status: PaymentStatus::derive(new_paid, total),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn header() -> PurchaseHeader {
        PurchaseHeader {
            supplier_id: Some("sup-1".to_string()),
            invoice_number: Some("INV-100".to_string()),
            ..PurchaseHeader::default()
        }
    }

    #[test]
    fn test_totals_with_discounts() {
        let items = [
            PurchaseLine {
                discount_cents: Some(500),
                ..PurchaseLine::new("flour", 10, 300)
            },
            PurchaseLine::new("oil", 2, 1250),
        ];
        let h = PurchaseHeader {
            discount_cents: Some(1000),
            ..header()
        };
        let draft = PurchaseDraft::build(&h, &items, date()).unwrap();

        assert_eq!(draft.lines[0].line_total.cents(), 2500);
        assert_eq!(draft.lines[1].line_total.cents(), 2500);
        assert_eq!(draft.subtotal.cents(), 5000);
        assert_eq!(draft.total.cents(), 4000);
        assert_eq!(draft.payment_status, PaymentStatus::Unpaid);
        assert_eq!(draft.purchase_date, date());
    }

    #[test]
    fn test_initial_payment_sets_status() {
        let h = PurchaseHeader {
            paid_amount_cents: Some(1000),
            payment_method: Some(SupplierPaymentMethod::Cash),
            ..header()
        };
        let draft = PurchaseDraft::build(&h, &[PurchaseLine::new("p", 1, 4000)], date()).unwrap();
        assert_eq!(draft.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_initial_payment_requires_method() {
        let h = PurchaseHeader {
            paid_amount_cents: Some(1000),
            ..header()
        };
        let err = PurchaseDraft::build(&h, &[PurchaseLine::new("p", 1, 4000)], date()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { ref field }) if field == "payment_method"
        ));
    }

    #[test]
    fn test_initial_overpayment_rejected() {
        let h = PurchaseHeader {
            paid_amount_cents: Some(5000),
            payment_method: Some(SupplierPaymentMethod::BankTransfer),
            ..header()
        };
        let err = PurchaseDraft::build(&h, &[PurchaseLine::new("p", 1, 4000)], date()).unwrap_err();
        assert!(matches!(err, CoreError::Overpayment { .. }));
    }

    #[test]
    fn test_missing_invoice_number() {
        let h = PurchaseHeader {
            invoice_number: None,
            ..header()
        };
        assert!(PurchaseDraft::build(&h, &[PurchaseLine::new("p", 1, 100)], date()).is_err());
    }

    #[test]
    fn test_partial_then_full_payment() {
        let total = Money::from_cents(10_000);

        let first = apply_payment(Money::zero(), total, Money::from_cents(4_000)).unwrap();
        assert_eq!(first.status, PaymentStatus::Partial);
        assert_eq!(first.remaining.cents(), 6_000);

        let second = apply_payment(first.new_paid, total, Money::from_cents(6_000)).unwrap();
        assert_eq!(second.status, PaymentStatus::Paid);
        assert_eq!(second.remaining, Money::zero());
    }

    #[test]
    fn test_payment_beyond_balance_rejected() {
        let err = apply_payment(
            Money::from_cents(10_000),
            Money::from_cents(10_000),
            Money::from_cents(1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Overpayment {
                amount: 1,
                outstanding: 0
            }
        ));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        assert!(apply_payment(Money::zero(), Money::from_cents(100), Money::zero()).is_err());
        assert!(apply_payment(Money::zero(), Money::from_cents(100), Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_oversized_unit_cost_rejected() {
        let err = PurchaseDraft::build(&header(), &[PurchaseLine::new("flour", 3, i64::MAX / 2)], date())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "items[0].unit_cost"
        ));
    }

    #[test]
    fn test_oversized_payment_rejected() {
        let err = apply_payment(Money::zero(), Money::from_cents(10_000), Money::from_cents(i64::MAX))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
    }
}
