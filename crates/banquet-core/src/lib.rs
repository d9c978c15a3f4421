//! # banquet-core: Pure Pricing Logic for Banquet
//!
//! This crate holds the reservation pricing rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Banquet Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    REST layer (external)                        │   │
//! │  │    routing, request schemas, auth                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ banquet-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │ promotion │  │  pricing  │  │  invoice  │  │   │
//! │  │   │  codec    │  │  rules    │  │  engine   │  │ projector │  │   │
//! │  │   │   vat     │  │ selector  │  │  policy   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  banquet-db (Storage Layer)                     │   │
//! │  │      SQLite, repositories, stock control, reservation service   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money strings ↔ integer cents, rounding helper
//! - [`vat`] - Base / VAT / net derivation and coherence check
//! - [`promotion`] - Promotion model, the ten rule evaluators, selection
//! - [`pricing`] - Order pricing and the recalculation policy
//! - [`invoice`] - Billing breakdown from snapshot or live pricing
//! - [`types`] - Domain types (Product, Order, Reservation, ...)
//! - [`validation`] - Order and catalog checks
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same catalog, same order, same `now` = same total
//! 2. **No I/O**: the storage layer loads a [`pricing::PricingCatalog`]
//! 3. **Integer Money**: cents (i64) everywhere, strings only at the edges
//! 4. **Explicit Errors**: typed [`CoreError`], never panics
//!
//! ## Example Usage
//!
//! ```rust
//! use banquet_core::money::{from_minor, to_minor};
//! use banquet_core::vat::from_base;
//!
//! let base = to_minor("10.00").unwrap();
//! let breakdown = from_base(base, 21).unwrap();
//! assert_eq!(from_minor(breakdown.net_cents), "12.10");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod pricing;
pub mod promotion;
pub mod types;
pub mod validation;
pub mod vat;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{project_invoice, InvoiceBreakdown, InvoiceLine, InvoiceSource};
pub use money::Money;
pub use pricing::{
    decide_recalculation, price_order, PricingCatalog, PricingRequest, PricingResult,
    Recalculation,
};
pub use promotion::{Promotion, PromotionRule, RuleKind};
pub use types::*;
pub use vat::{VatInput, VatResult};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product in an order.
pub const MAX_ITEM_QUANTITY: i64 = 999;
