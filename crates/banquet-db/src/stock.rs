//! # Stock Controller
//!
//! Ties stock movements to reservation writes.
//!
//! ## Create / Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TransactionSupport::Available                                          │
//! │                                                                         │
//! │   BEGIN                                                                 │
//! │     stock -= qty   (each line)                                         │
//! │     INSERT reservation                                                  │
//! │   COMMIT             ── any failure rolls everything back               │
//! │                                                                         │
//! │  TransactionSupport::Unavailable                                        │
//! │                                                                         │
//! │   warn!(..)                                                             │
//! │   stock -= qty   (each line)  ── committed one by one                  │
//! │   INSERT reservation          ── a failure here leaves stock reduced   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Which branch runs is decided once, at startup, by
//! [`TransactionSupport::resolve`]. The controller never switches branches
//! on a runtime error.
//!
//! ## Update
//! The reservation row is written with a compare-and-swap against the
//! version the caller priced from. Only the writer that wins the swap moves
//! stock, so two racing updates can never both apply a delta computed from
//! the same old order. The loser gets [`DbError::Conflict`] and nothing
//! changes.

use banquet_core::{Order, Reservation};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::config::TransactionMode;
use crate::error::{DbError, DbResult};
use crate::repository::product::update_stock_on;
use crate::repository::reservation::{
    deactivate_on, get_active_on, insert_on, update_if_unchanged_on,
};

// =============================================================================
// Capability Flag
// =============================================================================

/// Whether the store can run multi-statement transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSupport {
    Available,
    Unavailable,
}

impl TransactionSupport {
    /// Resolves the flag from configuration, probing the store in
    /// [`TransactionMode::Auto`].
    pub async fn resolve(mode: TransactionMode, pool: &SqlitePool) -> DbResult<Self> {
        let support = match mode {
            TransactionMode::Enabled => TransactionSupport::Available,
            TransactionMode::Disabled => TransactionSupport::Unavailable,
            TransactionMode::Auto => classify_probe(probe(pool).await)?,
        };

        info!(mode = %mode, support = ?support, "Transaction support resolved");
        Ok(support)
    }
}

/// Opens a transaction, touches the store, rolls back.
async fn probe(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT 1").execute(&mut *tx).await?;
    tx.rollback().await
}

/// A probe failure saying the store has no transactions at all means
/// "no transactions". Anything else is a real error.
fn classify_probe(result: Result<(), sqlx::Error>) -> DbResult<TransactionSupport> {
    match result {
        Ok(()) => Ok(TransactionSupport::Available),
        Err(err) => {
            let message = err.to_string();
            if DbError::signals_missing_transactions(&message) {
                let classified = DbError::TransactionUnavailable(message);
                warn!(error = %classified, "Store has no transaction support");
                Ok(TransactionSupport::Unavailable)
            } else {
                Err(err.into())
            }
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Stock mutations tied to reservation create and delete.
#[derive(Debug, Clone)]
pub struct StockController {
    pool: SqlitePool,
    support: TransactionSupport,
}

impl StockController {
    pub fn new(pool: SqlitePool, support: TransactionSupport) -> Self {
        StockController { pool, support }
    }

    pub fn support(&self) -> TransactionSupport {
        self.support
    }

    /// Subtracts every line quantity from product stock. No lower bound.
    pub async fn decrement(&self, order: &Order) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        apply_order(&mut conn, order, -1).await
    }

    /// Adds every line quantity back.
    pub async fn increment(&self, order: &Order) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        apply_order(&mut conn, order, 1).await
    }

    /// Reserves stock and inserts the reservation, atomically when the store
    /// allows it.
    pub async fn create_with_stock_control(&self, reservation: &Reservation) -> DbResult<()> {
        match self.support {
            TransactionSupport::Available => {
                let mut tx = self.pool.begin().await?;
                reserve_and_insert(&mut tx, reservation).await?;
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            }
            TransactionSupport::Unavailable => {
                warn!(
                    reservation_id = %reservation.id,
                    "Creating reservation without a transaction; stock and insert are not atomic"
                );
                let mut conn = self.pool.acquire().await?;
                reserve_and_insert(&mut conn, reservation).await?;
            }
        }

        info!(
            reservation_id = %reservation.id,
            lines = reservation.order.len(),
            "Reservation created and stock reserved"
        );
        Ok(())
    }

    /// Soft-deletes an active reservation and gives its stock back.
    ///
    /// An already inactive or unknown reservation is `NotFound`, and stock is
    /// never restored twice.
    pub async fn delete_with_stock_restore(&self, id: &str) -> DbResult<Reservation> {
        let reservation = match self.support {
            TransactionSupport::Available => {
                let mut tx = self.pool.begin().await?;
                let reservation = deactivate_and_restore(&mut tx, id).await?;
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                reservation
            }
            TransactionSupport::Unavailable => {
                warn!(
                    reservation_id = %id,
                    "Deleting reservation without a transaction; delete and restock are not atomic"
                );
                let mut conn = self.pool.acquire().await?;
                deactivate_and_restore(&mut conn, id).await?
            }
        };

        info!(reservation_id = %id, "Reservation deleted and stock restored");
        Ok(reservation)
    }

    /// Replaces `previous` with `updated`, moving stock by the difference
    /// between their orders.
    ///
    /// Fails with [`DbError::Conflict`] when the stored reservation no longer
    /// matches `previous`, and with `NotFound` when it was deleted.
    pub async fn update_with_stock_adjust(
        &self,
        previous: &Reservation,
        updated: &Reservation,
    ) -> DbResult<()> {
        match self.support {
            TransactionSupport::Available => {
                let mut tx = self.pool.begin().await?;
                adjust_and_update(&mut tx, previous, updated).await?;
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            }
            TransactionSupport::Unavailable => {
                warn!(
                    reservation_id = %updated.id,
                    "Updating reservation without a transaction; restock and update are not atomic"
                );
                let mut conn = self.pool.acquire().await?;
                adjust_and_update(&mut conn, previous, updated).await?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Steps (shared by both branches)
// =============================================================================

async fn apply_order(conn: &mut SqliteConnection, order: &Order, sign: i64) -> DbResult<()> {
    for (product_id, quantity) in order.lines() {
        update_stock_on(conn, product_id, sign * quantity).await?;
    }
    Ok(())
}

async fn reserve_and_insert(conn: &mut SqliteConnection, reservation: &Reservation) -> DbResult<()> {
    apply_order(conn, &reservation.order, -1).await?;
    insert_on(conn, reservation).await
}

async fn deactivate_and_restore(conn: &mut SqliteConnection, id: &str) -> DbResult<Reservation> {
    let reservation = get_active_on(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Reservation", id))?;

    // The guarded UPDATE decides; a concurrent delete that won already
    // restored the stock.
    if !deactivate_on(conn, id).await? {
        return Err(DbError::not_found("Reservation", id));
    }

    apply_order(conn, &reservation.order, 1).await?;
    Ok(reservation)
}

async fn adjust_and_update(
    conn: &mut SqliteConnection,
    previous: &Reservation,
    updated: &Reservation,
) -> DbResult<()> {
    if !update_if_unchanged_on(conn, previous, updated).await? {
        return Err(match get_active_on(conn, &updated.id).await? {
            Some(_) => DbError::conflict("Reservation", &updated.id),
            None => DbError::not_found("Reservation", &updated.id),
        });
    }

    let (old, new) = (&previous.order, &updated.order);
    let product_ids: std::collections::BTreeSet<&str> =
        old.product_ids().chain(new.product_ids()).collect();

    for product_id in product_ids {
        let delta = old.quantity_of(product_id) - new.quantity_of(product_id);
        if delta != 0 {
            debug!(product_id = %product_id, delta = delta, "Adjusting stock for order change");
            update_stock_on(conn, product_id, delta).await?;
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use banquet_core::{ConsumptionType, Product};
    use chrono::Utc;
    use std::collections::BTreeMap;

    async fn setup(mode: TransactionMode) -> Database {
        let db = Database::new(DbConfig::in_memory().transactions(mode))
            .await
            .unwrap();
        db.consumption_types()
            .insert(&ConsumptionType {
                id: "buffet".to_string(),
                name: "Buffet".to_string(),
            })
            .await
            .unwrap();
        for id in ["a", "b"] {
            let now = Utc::now();
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: id.to_string(),
                    stock: 20,
                    nominal_price: "1.00".to_string(),
                    supplement: BTreeMap::new(),
                    promotions: vec![],
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        db
    }

    fn reservation(id: &str, order: Order) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.to_string(),
            event_id: None,
            notes: None,
            order,
            consumption_type_id: "buffet".to_string(),
            total_amount_cents: 0,
            has_promo_applied: false,
            is_paid: false,
            is_delivered: false,
            applied_promotions_snapshot: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn stock(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_auto_mode_detects_sqlite_transactions() {
        let db = setup(TransactionMode::Auto).await;
        assert_eq!(db.stock().support(), TransactionSupport::Available);
    }

    #[test]
    fn test_probe_classification() {
        let unavailable = classify_probe(Err(sqlx::Error::Protocol(
            "Transaction numbers are only allowed on a replica set member".to_string(),
        )));
        assert_eq!(unavailable.unwrap(), TransactionSupport::Unavailable);

        let broken = classify_probe(Err(sqlx::Error::Protocol("disk full".to_string())));
        assert!(broken.is_err());

        let nested = classify_probe(Err(sqlx::Error::Protocol(
            "cannot start a transaction within a transaction".to_string(),
        )));
        assert!(nested.is_err());

        assert_eq!(classify_probe(Ok(())).unwrap(), TransactionSupport::Available);
    }

    #[tokio::test]
    async fn test_decrement_then_increment_restores() {
        let db = setup(TransactionMode::Enabled).await;
        let order = Order::new().with_line("a", 7).with_line("b", 3);

        db.stock().decrement(&order).await.unwrap();
        assert_eq!(stock(&db, "a").await, 13);
        assert_eq!(stock(&db, "b").await, 17);

        db.stock().increment(&order).await.unwrap();
        assert_eq!(stock(&db, "a").await, 20);
        assert_eq!(stock(&db, "b").await, 20);
    }

    #[tokio::test]
    async fn test_transactional_create_rolls_back_on_failure() {
        let db = setup(TransactionMode::Enabled).await;
        // Second line references an unknown product: nothing may stick.
        let r = reservation("r1", Order::new().with_line("a", 5).with_line("zzz", 1));

        assert!(db.stock().create_with_stock_control(&r).await.is_err());
        assert_eq!(stock(&db, "a").await, 20);
        assert!(db.reservations().get_by_id("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fallback_create_without_transaction() {
        let db = setup(TransactionMode::Disabled).await;
        assert_eq!(db.stock().support(), TransactionSupport::Unavailable);

        let r = reservation("r1", Order::new().with_line("a", 5));
        db.stock().create_with_stock_control(&r).await.unwrap();

        assert_eq!(stock(&db, "a").await, 15);
        assert!(db.reservations().get_by_id("r1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fallback_failure_keeps_partial_stock_change() {
        let db = setup(TransactionMode::Disabled).await;
        let mut r = reservation("r1", Order::new().with_line("a", 5));
        r.consumption_type_id = "unknown".to_string();

        assert!(db.stock().create_with_stock_control(&r).await.is_err());
        assert_eq!(stock(&db, "a").await, 15);
    }

    #[tokio::test]
    async fn test_delete_restores_once() {
        for mode in [TransactionMode::Enabled, TransactionMode::Disabled] {
            let db = setup(mode).await;
            let r = reservation("r1", Order::new().with_line("a", 4).with_line("b", 2));
            db.stock().create_with_stock_control(&r).await.unwrap();

            let deleted = db.stock().delete_with_stock_restore("r1").await.unwrap();
            assert_eq!(deleted.id, "r1");
            assert_eq!(stock(&db, "a").await, 20);
            assert_eq!(stock(&db, "b").await, 20);

            assert!(matches!(
                db.stock().delete_with_stock_restore("r1").await,
                Err(DbError::NotFound { .. })
            ));
            assert_eq!(stock(&db, "a").await, 20);
        }
    }

    #[tokio::test]
    async fn test_update_moves_stock_by_difference() {
        for mode in [TransactionMode::Enabled, TransactionMode::Disabled] {
            let db = setup(mode).await;
            let r = reservation("r1", Order::new().with_line("a", 4).with_line("b", 2));
            db.stock().create_with_stock_control(&r).await.unwrap();

            let mut updated = r.clone();
            updated.order = Order::new().with_line("a", 6);
            db.stock().update_with_stock_adjust(&r, &updated).await.unwrap();

            assert_eq!(stock(&db, "a").await, 14);
            assert_eq!(stock(&db, "b").await, 20);
            let stored = db.reservations().get_by_id("r1").await.unwrap().unwrap();
            assert_eq!(stored.order, updated.order);
        }
    }

    #[tokio::test]
    async fn test_stale_update_conflicts_without_moving_stock() {
        for mode in [TransactionMode::Enabled, TransactionMode::Disabled] {
            let db = setup(mode).await;
            let r = reservation("r1", Order::new().with_line("a", 3));
            db.stock().create_with_stock_control(&r).await.unwrap();

            let mut one = r.clone();
            one.order = Order::new().with_line("a", 1);
            db.stock().update_with_stock_adjust(&r, &one).await.unwrap();
            assert_eq!(stock(&db, "a").await, 19);

            // Priced from the three-unit order that was already replaced
            let mut two = r.clone();
            two.order = Order::new().with_line("a", 2);
            assert!(matches!(
                db.stock().update_with_stock_adjust(&r, &two).await,
                Err(DbError::Conflict { .. })
            ));
            assert_eq!(stock(&db, "a").await, 19);

            db.stock().delete_with_stock_restore("r1").await.unwrap();
            assert!(matches!(
                db.stock().update_with_stock_adjust(&one, &two).await,
                Err(DbError::NotFound { .. })
            ));
            assert_eq!(stock(&db, "a").await, 20);
        }
    }
}
