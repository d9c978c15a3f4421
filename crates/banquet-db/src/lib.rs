//! # banquet-db: Storage Layer for Banquet
//!
//! SQLite storage, stock control and reservation orchestration on top of
//! the pure pricing rules in `banquet-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Banquet Data Flow                                │
//! │                                                                         │
//! │  REST handler (external)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   banquet-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ReservationService ──► CatalogLoader ──► banquet-core pricing │   │
//! │  │          │                                                      │   │
//! │  │          ▼                                                      │   │
//! │  │   StockController (transaction or sequential fallback)          │   │
//! │  │          │                                                      │   │
//! │  │          ▼                                                      │   │
//! │  │   Repositories ─── Database (pool.rs) ─── Migrations            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (banquet.db)                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `DbConfig`, environment loading, transaction mode
//! - [`pool`] - Pool creation and the `Database` handle
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Products, promotions, consumption types, reservations
//! - [`catalog`] - Catalog slice loading for pricing
//! - [`stock`] - Stock control and transaction support
//! - [`service`] - Reservation create / update / delete / invoice
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use banquet_db::{Database, DbConfig, NewReservation};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let reservation = db
//!     .reservation_service()
//!     .create(new_reservation, chrono::Utc::now())
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::CatalogLoader;
pub use config::{ConfigError, DbConfig, TransactionMode};
pub use error::{DbError, DbResult};
pub use pool::Database;
pub use service::{NewReservation, ReservationService};
pub use stock::{StockController, TransactionSupport};

// Repository re-exports for convenience
pub use repository::consumption_type::ConsumptionTypeRepository;
pub use repository::product::ProductRepository;
pub use repository::promotion::PromotionRepository;
pub use repository::reservation::ReservationRepository;
