//! # Database Pool Management
//!
//! Connection pool creation and the handle every component is built from.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DbConfig::from_env() / DbConfig::new(path)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       ├── SqlitePool (WAL, foreign keys)                               │
//! │       ├── run migrations (if enabled)                                  │
//! │       └── resolve TransactionSupport once (config + probe)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.reservation_service() / db.stock() / db.products() ...             │
//! │  (cheap handles sharing the same pool)                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases use WAL so readers don't block writers. In-memory
//! databases keep SQLite's default journal.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

use crate::catalog::CatalogLoader;
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::consumption_type::ConsumptionTypeRepository;
use crate::repository::product::ProductRepository;
use crate::repository::promotion::PromotionRepository;
use crate::repository::reservation::ReservationRepository;
use crate::service::ReservationService;
use crate::stock::{StockController, TransactionSupport};

/// Main storage handle.
///
/// Passed explicitly to whatever needs storage; there is no global.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    transactions: TransactionSupport,
    default_vat_pct: u32,
}

impl Database {
    /// Creates the pool, runs migrations and resolves transaction support.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        config.validate()?;

        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);

        let connect_options = if config.is_in_memory() {
            // Closing the only connection would drop the database.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .foreign_keys(true)
        } else {
            pool_options = pool_options.idle_timeout(Some(config.idle_timeout));
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
                .create_if_missing(true)
        };

        debug!("Connection options configured");

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        if config.run_migrations {
            info!("Running database migrations");
            migrations::run_migrations(&pool).await?;
        }

        let transactions = TransactionSupport::resolve(config.transactions, &pool).await?;

        Ok(Database {
            pool,
            transactions,
            default_vat_pct: config.default_vat_pct,
        })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn transaction_support(&self) -> TransactionSupport {
        self.transactions
    }

    pub fn default_vat_pct(&self) -> u32 {
        self.default_vat_pct
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn promotions(&self) -> PromotionRepository {
        PromotionRepository::new(self.pool.clone())
    }

    pub fn consumption_types(&self) -> ConsumptionTypeRepository {
        ConsumptionTypeRepository::new(self.pool.clone())
    }

    pub fn reservations(&self) -> ReservationRepository {
        ReservationRepository::new(self.pool.clone())
    }

    pub fn catalog(&self) -> CatalogLoader {
        CatalogLoader::new(self.products(), self.promotions(), self.consumption_types())
    }

    pub fn stock(&self) -> StockController {
        StockController::new(self.pool.clone(), self.transactions)
    }

    pub fn reservation_service(&self) -> ReservationService {
        ReservationService::new(self.clone())
    }

    /// Closes the pool. Every handle derived from it stops working.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
