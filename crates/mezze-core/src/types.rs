//! # Domain Types
//!
//! Entities and tagged enums shared by every layer of Mezze POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Product ──< StockMovement          Shift ──< Sale ──< SaleItem         │
//! │                                                                         │
//! │  Purchase ──< PurchaseItem          HeldOrder (items as JSON blob)      │
//! │      └─────< PurchasePayment        CashExpense (drawer outflows)       │
//! │                                                                         │
//! │  Tagged enums: OrderType, PaymentMethod, SupplierPaymentMethod,         │
//! │                PaymentStatus, MovementDirection, ReferenceType          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4, immutable, used for relations
//! - Business key: product `code`, sale `order_number` / `receipt_number`,
//!   purchase `invoice_number`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Actor
// =============================================================================

/// The user performing an operation.
///
/// Passed explicitly into every settlement call; the engine never reads a
/// "current user" from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Actor { id: id.into() }
    }
}

// =============================================================================
// Order Type
// =============================================================================

/// How the order leaves the kitchen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    DineIn,
    Takeaway,
    /// Only this type carries a delivery fee.
    Delivery,
}

impl OrderType {
    #[inline]
    pub const fn allows_delivery_fee(&self) -> bool {
        matches!(self, OrderType::Delivery)
    }
}

// =============================================================================
// Payment Method (sales)
// =============================================================================

/// How a customer settled a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Customer account, settled later.
    Credit,
    /// Free of charge (staff meals, comps).
    Foc,
    /// Collected by the rider; lands in the drawer as cash.
    CashOnDelivery,
}

/// The shift aggregate a payment method contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftBucket {
    Cash,
    Card,
    Credit,
    Foc,
}

impl PaymentMethod {
    /// Maps the method onto exactly one shift bucket.
    ///
    /// ```rust
    /// use mezze_core::{PaymentMethod, ShiftBucket};
    ///
    /// assert_eq!(PaymentMethod::CashOnDelivery.shift_bucket(), ShiftBucket::Cash);
    /// ```
    pub const fn shift_bucket(&self) -> ShiftBucket {
        match self {
            PaymentMethod::Cash | PaymentMethod::CashOnDelivery => ShiftBucket::Cash,
            PaymentMethod::Card => ShiftBucket::Card,
            PaymentMethod::Credit => ShiftBucket::Credit,
            PaymentMethod::Foc => ShiftBucket::Foc,
        }
    }
}

// =============================================================================
// Supplier Payment Method (purchases)
// =============================================================================

/// How the restaurant paid a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierPaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

impl SupplierPaymentMethod {
    /// Whether the payment is taken out of the till drawer.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, SupplierPaymentMethod::Cash)
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement state of a supplier invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status from the amount paid against the invoice total.
    ///
    /// ```text
    /// paid == 0           → UNPAID   (checked first, so a zero invoice is UNPAID)
    /// paid >= total       → PAID
    /// otherwise           → PARTIAL
    /// ```
    pub fn derive(paid: Money, total: Money) -> Self {
        if paid.is_zero() {
            PaymentStatus::Unpaid
        } else if paid >= total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }
}

// =============================================================================
// Stock Movement Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    /// Direction implied by a signed stock delta (zero is not a movement).
    pub const fn from_delta(delta: i64) -> Option<Self> {
        if delta > 0 {
            Some(MovementDirection::In)
        } else if delta < 0 {
            Some(MovementDirection::Out)
        } else {
            None
        }
    }
}

/// The kind of transaction that caused a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Sale,
    Purchase,
    Adjustment,
}

// =============================================================================
// Product
// =============================================================================

/// A menu item or stocked ingredient.
///
/// `quantity_on_hand` is a projection of `initial_stock` plus the movement
/// log; it is only written by the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Business identifier printed on menus and invoices.
    pub code: String,
    pub name: String,
    pub quantity_on_hand: i64,
    /// Stock level when the product was created.
    pub initial_stock: i64,
    /// At or below this level the product shows up in low-stock reports.
    pub reorder_level: i64,
    pub cost_price_cents: i64,
    pub sell_price_cents: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sell_price(&self) -> Money {
        Money::from_cents(self.sell_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Checks whether the product has fallen to its reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.quantity_on_hand <= self.reorder_level
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub initial_stock: i64,
    pub reorder_level: i64,
    pub cost_price_cents: i64,
    pub sell_price_cents: i64,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One immutable row of the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub direction: MovementDirection,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    /// Always positive; the sign comes from `direction`.
    pub quantity: i64,
    pub reason: String,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Quantity with the direction applied (IN positive, OUT negative).
    pub fn signed_quantity(&self) -> i64 {
        match self.direction {
            MovementDirection::In => self.quantity,
            MovementDirection::Out => -self.quantity,
        }
    }
}

/// Result of a stock mutation: the level before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockLevel {
    pub old: i64,
    pub new: i64,
}

/// Comparison of the stored quantity against the replayed movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerAudit {
    pub product_id: String,
    pub quantity_on_hand: i64,
    pub initial_stock: i64,
    pub total_in: i64,
    pub total_out: i64,
}

impl LedgerAudit {
    /// `initial_stock + Σ IN − Σ OUT`.
    pub fn replayed_quantity(&self) -> i64 {
        self.initial_stock + self.total_in - self.total_out
    }

    pub fn is_consistent(&self) -> bool {
        self.replayed_quantity() == self.quantity_on_hand
    }
}

// =============================================================================
// Customer Snapshot
// =============================================================================

/// Customer details copied onto an order at the time it was taken.
///
/// Not a foreign key: editing the customer later never rewrites history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerSnapshot {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerSnapshot {
    /// Trims fields and drops the empty ones.
    pub fn normalized(&self) -> Self {
        fn clean(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        CustomerSnapshot {
            name: clean(&self.name),
            phone: clean(&self.phone),
            address: clean(&self.address),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale. Immutable apart from `is_printed`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub order_number: String,
    pub receipt_number: String,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    pub amount_received_cents: i64,
    pub change_cents: i64,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub table_number: Option<String>,
    pub notes: Option<String>,
    /// Shift the sale was folded into; `None` if no shift was open.
    pub shift_id: Option<String>,
    pub cashier_id: String,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub is_printed: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
/// Product name is frozen at the time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub note: Option<String>,
}

/// A sale with its lines, as read back for receipts and reports.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Held Order
// =============================================================================

/// A cart line as the till sends it.
///
/// Every field is optional on the wire; [`crate::sale::SaleHeader::validate`]
/// decides which are required. Held orders store these verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price_cents: Option<i64>,
    /// Computed as `quantity × unit price` when absent.
    pub line_total_cents: Option<i64>,
    pub note: Option<String>,
}

impl CartLine {
    /// Convenience constructor for a fully specified line.
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        CartLine {
            product_id: Some(product_id.into()),
            quantity: Some(quantity),
            unit_price_cents: Some(unit_price_cents),
            ..CartLine::default()
        }
    }
}

/// A parked cart. Never touches inventory or shift totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HeldOrder {
    pub id: String,
    pub order_number: String,
    pub order_type: OrderType,
    pub customer: CustomerSnapshot,
    pub table_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    pub held_by: String,
    #[ts(as = "String")]
    pub held_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// A supplier invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub paid_amount_cents: i64,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// Amount still owed to the supplier.
    pub fn outstanding(&self) -> Money {
        (Money::from_cents(self.total_cents) - Money::from_cents(self.paid_amount_cents))
            .floor_zero()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub discount_cents: i64,
    pub line_total_cents: i64,
}

/// One payment made against a supplier invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchasePayment {
    pub id: String,
    pub purchase_id: String,
    pub amount_cents: i64,
    pub method: SupplierPaymentMethod,
    pub shift_id: Option<String>,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

/// Cash taken out of the drawer (supplier payments made in cash).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashExpense {
    pub id: String,
    pub shift_id: Option<String>,
    pub purchase_id: Option<String>,
    pub amount_cents: i64,
    pub description: String,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Shift
// =============================================================================

/// A cashier's register session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub cashier_id: String,
    pub opening_balance_cents: i64,
    pub total_sales_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub credit_sales_cents: i64,
    pub foc_sales_cents: i64,
    pub discount_amount_cents: i64,
    pub sale_count: i64,
    pub is_closed: bool,
    pub closing_cash_cents: Option<i64>,
    pub expected_cash_cents: Option<i64>,
    pub cash_difference_cents: Option<i64>,
    pub closing_notes: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Shift {
    #[inline]
    pub fn opening_balance(&self) -> Money {
        Money::from_cents(self.opening_balance_cents)
    }

    #[inline]
    pub fn cash_sales(&self) -> Money {
        Money::from_cents(self.cash_sales_cents)
    }

    /// Amount recorded for one bucket.
    pub fn bucket_total(&self, bucket: ShiftBucket) -> Money {
        Money::from_cents(match bucket {
            ShiftBucket::Cash => self.cash_sales_cents,
            ShiftBucket::Card => self.card_sales_cents,
            ShiftBucket::Credit => self.credit_sales_cents,
            ShiftBucket::Foc => self.foc_sales_cents,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
