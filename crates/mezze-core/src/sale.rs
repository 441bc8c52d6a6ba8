//! # Sale Drafts
//!
//! Turns what the till sends (a loose header plus cart lines) into a
//! [`SaleDraft`] the database layer can settle without further checks.
//!
//! ## Settlement Pipeline
//! ```text
//! SaleHeader + Vec<CartLine>        (wire shape, everything optional)
//!      │
//!      ▼
//! SaleHeader::validate ← THIS MODULE
//!      ├── required: order_type, payment_method, subtotal, total, items
//!      ├── per line: product_id, quantity (1..=999), unit price (>= 0)
//!      ├── normalise: defaults to zero, delivery fee only for DELIVERY
//!      └── total == subtotal − discount + delivery_fee
//!      │
//!      ▼
//! SaleDraft                         (mezze-db settles it in one transaction)
//!      │
//!      ▼
//! ShiftIncrement::for_sale          (what the attached shift gains)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CartLine, CustomerSnapshot, HeldOrder, OrderType, PaymentMethod, ShiftBucket};
use crate::validation::{
    optional_text, require, require_text, validate_line_count, validate_non_negative,
    validate_quantity, ValidationResult,
};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY};

// =============================================================================
// Wire Shape
// =============================================================================

/// Sale header as sent by the caller.
///
/// `order_number` is optional: when absent the numbering service allocates
/// one inside the settlement transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleHeader {
    pub order_number: Option<String>,
    pub order_type: Option<OrderType>,
    pub payment_method: Option<PaymentMethod>,
    pub subtotal_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub delivery_fee_cents: Option<i64>,
    pub total_cents: Option<i64>,
    pub amount_received_cents: Option<i64>,
    pub change_cents: Option<i64>,
    #[serde(default)]
    pub customer: CustomerSnapshot,
    pub table_number: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Validated Draft
// =============================================================================

/// A sale line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub product_id: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub note: Option<String>,
}

/// A sale ready to be settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDraft {
    /// Preferred order number (e.g. kept from a held order).
    pub order_number: Option<String>,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub amount_received: Money,
    pub change: Money,
    pub customer: CustomerSnapshot,
    pub table_number: Option<String>,
    pub notes: Option<String>,
    pub lines: Vec<SaleLine>,
}

impl SaleHeader {
    /// Validates the header and its lines into a [`SaleDraft`].
    ///
    /// ## Example
    /// ```rust
    /// use mezze_core::sale::SaleHeader;
    /// use mezze_core::{CartLine, OrderType, PaymentMethod};
    ///
    /// let header = SaleHeader {
    ///     order_type: Some(OrderType::Takeaway),
    ///     payment_method: Some(PaymentMethod::Cash),
    ///     subtotal_cents: Some(1350),
    ///     total_cents: Some(1350),
    ///     ..SaleHeader::default()
    /// };
    /// let draft = header.validate(&[CartLine::new("p1", 3, 450)]).unwrap();
    /// assert_eq!(draft.lines[0].line_total.cents(), 1350);
    /// ```
    pub fn validate(&self, items: &[CartLine]) -> ValidationResult<SaleDraft> {
        let order_number = match &self.order_number {
            Some(n) => Some(require_text("order_number", Some(n))?),
            None => None,
        };
        let order_type = require("order_type", self.order_type)?;
        let payment_method = require("payment_method", self.payment_method)?;
        let subtotal = Money::from_cents(require("subtotal", self.subtotal_cents)?);
        let total = Money::from_cents(require("total", self.total_cents)?);

        validate_line_count(items.len())?;

        let discount = Money::from_cents(self.discount_cents.unwrap_or(0));
        let delivery_fee = if order_type.allows_delivery_fee() {
            Money::from_cents(self.delivery_fee_cents.unwrap_or(0))
        } else {
            Money::zero()
        };
        let amount_received = Money::from_cents(self.amount_received_cents.unwrap_or(0));
        let change = Money::from_cents(self.change_cents.unwrap_or(0));

        validate_non_negative("subtotal", subtotal.cents())?;
        validate_non_negative("discount", discount.cents())?;
        validate_non_negative("delivery_fee", delivery_fee.cents())?;
        validate_non_negative("amount_received", amount_received.cents())?;
        validate_non_negative("change", change.cents())?;

        if discount > subtotal {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: subtotal.cents(),
            });
        }

        let expected_total = subtotal - discount + delivery_fee;
        if expected_total != total {
            return Err(ValidationError::Mismatch {
                field: "total".to_string(),
                expected: expected_total.cents(),
                actual: total.cents(),
            });
        }

        let lines = items
            .iter()
            .enumerate()
            .map(|(i, line)| validate_line(i, line))
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(SaleDraft {
            order_number,
            order_type,
            payment_method,
            subtotal,
            discount,
            delivery_fee,
            total,
            amount_received,
            change,
            customer: self.customer.normalized(),
            table_number: optional_text(self.table_number.as_deref()),
            notes: optional_text(self.notes.as_deref()),
            lines,
        })
    }
}

fn validate_line(index: usize, line: &CartLine) -> ValidationResult<SaleLine> {
    let field = |name: &str| format!("items[{index}].{name}");

    let product_id = require_text(&field("product_id"), line.product_id.as_deref())?;
    let quantity = require(&field("quantity"), line.quantity)?;
    validate_quantity(&field("quantity"), quantity, MAX_ITEM_QUANTITY)?;
    let unit_price = require(&field("unit_price"), line.unit_price_cents)?;
    validate_non_negative(&field("unit_price"), unit_price)?;

    let unit_price = Money::from_cents(unit_price);
    let line_total = match line.line_total_cents {
        Some(total) => {
            validate_non_negative(&field("line_total"), total)?;
            Money::from_cents(total)
        }
        None => unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: field("unit_price"),
                min: 0,
                max: MAX_AMOUNT_CENTS,
            })?,
    };

    Ok(SaleLine {
        product_id,
        product_name: optional_text(line.product_name.as_deref()),
        quantity,
        unit_price,
        line_total,
        note: optional_text(line.note.as_deref()),
    })
}

// =============================================================================
// Held Carts
// =============================================================================

/// A cart being parked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HeldCart {
    pub order_number: Option<String>,
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub customer: CustomerSnapshot,
    pub table_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
    pub discount_cents: Option<i64>,
    pub delivery_fee_cents: Option<i64>,
}

/// Totals computed for a parked cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl HeldCart {
    /// Checks a cart before parking it and computes its totals.
    ///
    /// Lines get the same checks as at settlement, so a parked cart can
    /// always be settled once resumed. Lines are stored verbatim.
    pub fn validate(&self) -> ValidationResult<(OrderType, CartTotals)> {
        let order_type = require("order_type", self.order_type)?;
        validate_line_count(self.items.len())?;

        let lines = self
            .items
            .iter()
            .enumerate()
            .map(|(i, line)| validate_line(i, line))
            .collect::<ValidationResult<Vec<_>>>()?;
        let subtotal: Money = lines.iter().map(|l| l.line_total).sum();

        let discount = Money::from_cents(self.discount_cents.unwrap_or(0));
        validate_non_negative("discount", discount.cents())?;
        if discount > subtotal {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: subtotal.cents(),
            });
        }
        let delivery_fee = if order_type.allows_delivery_fee() {
            Money::from_cents(self.delivery_fee_cents.unwrap_or(0))
        } else {
            Money::zero()
        };
        validate_non_negative("delivery_fee", delivery_fee.cents())?;

        Ok((
            order_type,
            CartTotals {
                subtotal,
                discount,
                delivery_fee,
                total: subtotal - discount + delivery_fee,
            },
        ))
    }
}

impl HeldOrder {
    /// Rebuilds the sale request for a resumed cart.
    ///
    /// The caller still has to choose how the customer pays and pass the
    /// result to sale settlement; resuming never creates a sale on its own.
    pub fn to_sale_request(&self, payment_method: PaymentMethod) -> (SaleHeader, Vec<CartLine>) {
        let header = SaleHeader {
            order_number: Some(self.order_number.clone()),
            order_type: Some(self.order_type),
            payment_method: Some(payment_method),
            subtotal_cents: Some(self.subtotal_cents),
            discount_cents: Some(self.discount_cents),
            delivery_fee_cents: Some(self.delivery_fee_cents),
            total_cents: Some(self.total_cents),
            amount_received_cents: None,
            change_cents: None,
            customer: self.customer.clone(),
            table_number: self.table_number.clone(),
            notes: self.notes.clone(),
        };
        (header, self.items.clone())
    }
}

// =============================================================================
// Shift Increment
// =============================================================================

/// The amounts a committed sale adds to its shift.
///
/// Exactly one of the four buckets is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftIncrement {
    pub total_sales: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub credit_sales: Money,
    pub foc_sales: Money,
    pub discount: Money,
}

impl ShiftIncrement {
    pub fn for_sale(draft: &SaleDraft) -> Self {
        let mut inc = ShiftIncrement {
            total_sales: draft.total,
            cash_sales: Money::zero(),
            card_sales: Money::zero(),
            credit_sales: Money::zero(),
            foc_sales: Money::zero(),
            discount: if draft.discount.is_positive() {
                draft.discount
            } else {
                Money::zero()
            },
        };

        match draft.payment_method.shift_bucket() {
            ShiftBucket::Cash => inc.cash_sales = draft.total,
            ShiftBucket::Card => inc.card_sales = draft.total,
            ShiftBucket::Credit => inc.credit_sales = draft.total,
            ShiftBucket::Foc => inc.foc_sales = draft.total,
        }

        inc
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
