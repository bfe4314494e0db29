//! # Error Types
//!
//! Domain-specific error types for pharma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharma-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pharma-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  REST API errors (in app)                                              │
//! │  └── ApiError         - {message, statusCode} JSON for the frontend    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (amounts, SKU, ID)
//! 3. Errors are enum variants, never String
//! 4. A failed operation never mutates state

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Payment or refund amount is non-positive.
    ///
    /// ## When This Occurs
    /// - Recording a payment of zero or negative cents
    /// - Refunding a non-positive amount
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Payment would push `paid` above `total`.
    ///
    /// Rejected before any state mutation; the caller re-prompts with the
    /// outstanding balance.
    #[error("Payment of {attempted_cents} cents exceeds outstanding balance of {outstanding_cents} cents")]
    Overpayment {
        attempted_cents: i64,
        outstanding_cents: i64,
    },

    /// Cash received at the POS is less than the grand total.
    ///
    /// The sale is not completed and the cart is preserved.
    #[error("Insufficient funds: received {received_cents} cents, required {required_cents} cents")]
    InsufficientFunds {
        received_cents: i64,
        required_cents: i64,
    },

    /// Refunds are only reachable from Paid or Partial.
    #[error("Cannot refund an invoice in {status} status")]
    RefundNotAllowed { status: String },

    /// Refund amount exceeds what was actually paid.
    #[error("Refund of {attempted_cents} cents exceeds amount paid ({paid_cents} cents)")]
    RefundTooLarge {
        attempted_cents: i64,
        paid_cents: i64,
    },

    /// Entity is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing lines on a finalized invoice
    /// - Recording a payment against a refunded invoice
    /// - Receiving a cancelled purchase order
    #[error("{entity} is {status}, cannot perform operation")]
    InvalidStatus { entity: String, status: String },

    /// Drug cannot be found.
    #[error("Drug not found: {0}")]
    DrugNotFound(String),

    /// Invoice cannot be found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Not enough stock to dispense the requested quantity.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Invoice has exceeded the maximum allowed line count.
    #[error("Invoice cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements; they are raised
/// before business logic runs.
#[derive(Debug, Error)]
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

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::Overpayment {
            attempted_cents: 15000,
            outstanding_cents: 10000,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 15000 cents exceeds outstanding balance of 10000 cents"
        );

        let err = CoreError::InsufficientStock {
            sku: "AMOX-500".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for AMOX-500: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
