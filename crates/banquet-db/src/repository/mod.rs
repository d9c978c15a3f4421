//! # Repository Module
//!
//! One repository per stored entity.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ReservationService / StockController / CatalogLoader                  │
//! │       │                                                                 │
//! │       │  db.products().get_by_id("croquetas")                          │
//! │       ▼                                                                 │
//! │  ProductRepository ─┐                                                  │
//! │  PromotionRepository├── row struct ──TryFrom──► banquet-core type      │
//! │  ReservationRepo.  ─┘    (JSON TEXT columns decoded here)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! │                                                                         │
//! │  Pool-level methods for plain reads and writes; `*_on(conn, ..)`       │
//! │  functions for work that must share a transaction.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Products, supplements, stock deltas
//! - [`promotion::PromotionRepository`] - Promotions and their rules
//! - [`consumption_type::ConsumptionTypeRepository`] - Consumption types
//! - [`reservation::ReservationRepository`] - Reservations and snapshots

pub mod consumption_type;
pub mod product;
pub mod promotion;
pub mod reservation;
