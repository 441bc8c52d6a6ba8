//! # Validation Module
//!
//! Field-level validators used by the sale, held-order and purchase drafts.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Till UI           - immediate feedback (not in this repo)    │
//! │  Layer 2: THIS MODULE       - required fields, ranges, formats         │
//! │  Layer 3: SQLite            - NOT NULL, UNIQUE, CHECK (qty >= 0)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator runs before the first write of a settlement, so a
//! failure here never needs a rollback.

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Presence
// =============================================================================

/// Returns the trimmed value of a required text field.
///
/// ## Example
/// ```rust
/// use mezze_core::validation::require_text;
///
/// assert_eq!(require_text("invoice_number", Some(" INV-7 ")).unwrap(), "INV-7");
/// assert!(require_text("invoice_number", Some("  ")).is_err());
/// assert!(require_text("invoice_number", None).is_err());
/// ```
pub fn require_text(field: &str, value: Option<&str>) -> ValidationResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::required(field)),
    }
}

/// Unwraps a required non-text field.
pub fn require<T>(field: &str, value: Option<T>) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::required(field))
}

/// Trims an optional text field, mapping blanks to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use mezze_core::validation::validate_product_code;
///
/// assert!(validate_product_code("KOFTA-LAMB").is_ok());
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("has space").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: positive and at most `max`.
///
/// ## User Workflow
/// ```text
/// Cart line: qty 1000 of "Ayran"
///      │
///      ▼
/// validate_quantity("items[2].quantity", 1000, 999)
///      │
///      └── Error: "items[2].quantity must be between 1 and 999"
/// ```
pub fn validate_quantity(field: &str, qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero but never negative
/// (prices, discounts, fees, opening floats, counted cash).
///
/// Bounded above by [`MAX_AMOUNT_CENTS`].
pub fn validate_non_negative(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount: strictly positive, at most [`MAX_AMOUNT_CENTS`].
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level set by hand (may be zero).
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    validate_non_negative("quantity", qty)
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a cart or invoice: 1 to MAX_CART_ITEMS.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("items"));
    }

    if count > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("f", Some("x")).unwrap(), "x");
        assert_eq!(
            require_text("order_number", Some("")).unwrap_err(),
            ValidationError::required("order_number")
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some(" T4 ")), Some("T4".to_string()));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("FALAFEL_6").is_ok());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Lamb Kofta Plate").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("q", 1, 999).is_ok());
        assert!(validate_quantity("q", 999, 999).is_ok());
        assert!(validate_quantity("q", 0, 999).is_err());
        assert!(validate_quantity("q", -1, 999).is_err());
        assert!(validate_quantity("q", 1000, 999).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_non_negative("discount", 0).is_ok());
        assert!(validate_non_negative("discount", -1).is_err());
        assert!(validate_non_negative("unit_price", MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_non_negative("unit_price", MAX_AMOUNT_CENTS + 1).is_err());
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert_eq!(
            validate_line_count(0).unwrap_err(),
            ValidationError::required("items")
        );
        assert!(validate_line_count(MAX_CART_ITEMS + 1).is_err());
    }
}
