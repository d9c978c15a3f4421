//! # Error Types
//!
//! Domain-specific error types for banquet-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  banquet-core errors (this file)                                       │
//! │  ├── CoreError        - Pricing, VAT and money failures                │
//! │  └── ValidationError  - Order input validation failures                │
//! │                                                                         │
//! │  banquet-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → REST layer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these errors are retryable: they describe malformed or
//! contradictory input, or a reservation whose price is frozen.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A money string could not be parsed into cents.
    #[error("Invalid money amount '{input}': {reason}")]
    InvalidMoney { input: String, reason: String },

    /// VAT percentage outside the allowed set (0, 4, 10, 21).
    #[error("Invalid VAT rate: {pct}% (allowed: 0, 4, 10, 21)")]
    InvalidVatRate { pct: u32 },

    /// VAT input is neither base-only, net-only nor a full triple.
    #[error("Invalid VAT input: {reason}")]
    InvalidVatInput { reason: String },

    /// A fully specified VAT triple does not add up.
    ///
    /// Carries the values recomputed from the base price so the caller can
    /// show what was expected.
    #[error(
        "Incoherent VAT triple: expected vat {expected_vat_amount} and net {expected_net_price} \
         for base {expected_base_price} at {vat_pct}%"
    )]
    IncoherentVatTriple {
        vat_pct: u32,
        expected_base_price: String,
        expected_vat_amount: String,
        expected_net_price: String,
    },

    /// Price recomputation attempted on a paid or delivered reservation.
    ///
    /// ## When This Occurs
    /// - Pricing called with `is_paid || is_delivered` and no skip flag
    /// - Updating order or consumption type of a frozen reservation
    #[error("Reservation price is frozen (paid or delivered)")]
    PriceFrozen,

    /// A product, promotion or consumption type referenced by the order
    /// does not exist. Pricing of the whole order is aborted.
    #[error("{entity} not found: {id}")]
    MissingReferencedEntity { entity: String, id: String },

    /// Not enough stock to reserve the requested quantity.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a MissingReferencedEntity error.
    pub fn missing(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::MissingReferencedEntity {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
