//! # Core Error Types
//!
//! All domain errors are typed enums via `thiserror`. Nothing in this crate
//! panics on bad input; every fallible operation returns a [`CoreResult`].
//!
//! ## Error Philosophy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHO FAILED?                                                            │
//! │                                                                         │
//! │  ValidationError  →  the INPUT is malformed (shape, range, format)     │
//! │  CoreError        →  the OPERATION cannot proceed (unknown key,        │
//! │                      insufficient stock, wrong lifecycle state)        │
//! │                                                                         │
//! │  Boundary adapters map these onto status codes; this crate knows       │
//! │  nothing about HTTP.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for validation functions.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Domain errors for the invoice–inventory engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A cart or request referenced a stock item that does not exist
    /// (or has been retired).
    #[error("unknown stock item: {0}")]
    UnknownItem(String),

    /// A request referenced an invoice that does not exist.
    #[error("unknown invoice: {0}")]
    UnknownInvoice(String),

    /// A commit would drive an item's quantity-on-hand below zero.
    ///
    /// Carries the FIRST offending item in cart order, with the observed
    /// availability at decision time.
    #[error("insufficient stock for item {item_id}: {available} available, {requested} requested")]
    InsufficientStock {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// Invoice creation was attempted with no cart lines.
    #[error("cannot create an invoice from an empty cart")]
    EmptyCart,

    /// Payment was attempted on an invoice that is already paid.
    #[error("invoice already paid: {0}")]
    AlreadyPaid(String),

    /// A cart line failed structural checks (price, quantity, or rate).
    /// `line` is the zero-based position of the first offending line.
    #[error("invalid line item at position {line}: {reason}")]
    InvalidLineItem { line: usize, reason: String },

    /// The engine could not acquire its commit resources within the
    /// bounded retry budget. The operation had no effect; retry later.
    #[error("engine busy, retry later")]
    Busy,

    /// Input failed a field-level validation rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Field-level input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: String,
    },
}
