//! # Input Validation
//!
//! Field-level validation rules shared by every boundary. Each function
//! checks exactly one field and returns a typed [`ValidationError`] on
//! failure, so adapters can surface precise messages without string
//! matching.

use uuid::Uuid;

use crate::error::{ValidationError, ValidationResult};
use crate::{MAX_LINE_QUANTITY, MAX_CART_LINES};
use crate::tax::MAX_TAX_RATE_BPS;

/// Maximum length for item and customer names.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum length for HSN codes (8 digits covers the full HSN hierarchy).
pub const MAX_HSN_LENGTH: usize = 8;

/// Validates a stock item name: required, trimmed-non-empty, bounded.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field: "item name" });
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "item name",
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Validates a customer name. Empty is allowed (the engine substitutes a
/// walk-in placeholder), but a provided name must fit.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    if name.trim().len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "customer name",
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Validates a cart line quantity: 1..=MAX_LINE_QUANTITY.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates the number of distinct lines in a cart.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines",
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }
    Ok(())
}

/// Validates an absolute stock quantity (replenishment / adjustment target).
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::MustBePositive {
            field: "stock quantity",
        });
    }
    Ok(())
}

/// Validates a unit price in cents.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBePositive { field: "unit price" });
    }
    Ok(())
}

/// Validates a tax rate in basis points: 0..=10000 (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_TAX_RATE_BPS {
        return Err(ValidationError::OutOfRange {
            field: "tax rate",
            min: 0,
            max: MAX_TAX_RATE_BPS as i64,
        });
    }
    Ok(())
}

/// Validates an HSN code: digits only, bounded length. Empty is fine, the
/// field is optional.
pub fn validate_hsn_code(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Ok(());
    }
    if code.len() > MAX_HSN_LENGTH {
        return Err(ValidationError::TooLong {
            field: "hsn code",
            max: MAX_HSN_LENGTH,
        });
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "hsn code",
            reason: "must contain only digits".into(),
        });
    }
    Ok(())
}

/// Validates that a string is a well-formed UUID.
pub fn validate_uuid(field: &'static str, value: &str) -> ValidationResult<()> {
    if Uuid::parse_str(value).is_err() {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be a valid UUID".into(),
        });
    }
    Ok(())
}
