//! # Error Types
//!
//! Domain-specific error types for mezze-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mezze-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Missing / malformed input fields               │
//! │                                                                         │
//! │  mezze-db errors                                                        │
//! │  └── DbError          - Persistence failures (wraps CoreError)         │
//! │                                                                         │
//! │  mezze-api errors                                                       │
//! │  └── ApiError         - { code, message } handed to the caller         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while settling sales and purchases.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product referenced by a line does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A stock reduction cannot be satisfied.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart line: 3 × Lamb Kofta
    ///      │
    ///      ▼
    /// Guarded decrement: on hand = 2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Lamb Kofta", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, till shows "Only 2 Lamb Kofta in stock"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The shift attached to a sale is closed or unknown.
    #[error("Shift {0} is not open")]
    ShiftNotOpen(String),

    /// The cashier already has an open shift.
    #[error("Cashier {cashier_id} already has an open shift ({shift_id})")]
    ShiftAlreadyOpen { cashier_id: String, shift_id: String },

    /// A supplier payment would take the paid amount past the invoice total.
    #[error("Payment of {amount} exceeds outstanding balance of {outstanding}")]
    Overpayment { amount: i64, outstanding: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens; the message names the offending field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A derived amount does not match what the caller sent.
    #[error("{field} should be {expected} but was {actual}")]
    Mismatch {
        field: String,
        expected: i64,
        actual: i64,
    },

    /// Duplicate value (e.g., duplicate invoice number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for the most common variant.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
