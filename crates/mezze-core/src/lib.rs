//! # mezze-core: Pure Business Logic for Mezze POS
//!
//! Everything the settlement engine decides without touching a database:
//! cart validation, sale and purchase totals, payment status, shift cash
//! reconciliation, and the formats of human-facing order/receipt numbers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mezze POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Till / Back-office UI (not part of this workspace)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mezze-api commands                           │   │
//! │  │    create_sale, hold_order, create_purchase, make_payment ...   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mezze-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌─────────┐ │   │
//! │  │   │  money  │ │  sale   │ │ purchase │ │  shift  │ │numbering│ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • NO RANDOMNESS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              mezze-db (ledger, settlements, shifts)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and tagged enums (Product, Sale, Purchase, Shift ...)
//! - [`money`] - Integer money type
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validators
//! - [`sale`] - Sale draft validation and shift buckets
//! - [`purchase`] - Purchase totals and payment status
//! - [`shift`] - Cash reconciliation
//! - [`numbering`] - Order and receipt number formats
//!
//! ## Example Usage
//!
//! ```rust
//! use mezze_core::money::Money;
//! use mezze_core::PaymentStatus;
//!
//! let total = Money::from_cents(10_000);
//! let paid = Money::from_cents(4_000);
//! assert_eq!(PaymentStatus::derive(paid, total), PaymentStatus::Partial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod numbering;
pub mod purchase;
pub mod sale;
pub mod shift;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart or purchase invoice.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches fat-finger entries (1000 instead of 10) at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum quantity on a single purchase line (cases of stock arrive in bulk).
pub const MAX_PURCHASE_QUANTITY: i64 = 100_000;

/// Ceiling for any single amount a caller sends (price, fee, payment, count).
///
/// With the quantity and line limits above, every line total and invoice
/// sum stays far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
