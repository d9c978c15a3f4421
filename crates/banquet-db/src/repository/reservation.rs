//! # Reservation Repository
//!
//! Reservation rows and their JSON columns. Writes that must share a
//! transaction with stock updates go through the `*_on` functions, which
//! take an explicit connection.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  insert ──► active, open ──update──► active, open                      │
//! │                  │                                                      │
//! │                  ├──update(is_paid / is_delivered)──► active, frozen    │
//! │                  │                                     (snapshot set)   │
//! │                  ▼                                                      │
//! │             deactivate ──► inactive (reads return None)                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use banquet_core::{Order, PromotionLineSnapshot, Reservation};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_RESERVATION: &str = r#"
    SELECT id, event_id, notes, order_lines, consumption_type_id,
           total_amount_cents, has_promo_applied, is_paid, is_delivered,
           applied_promotions_snapshot, is_active, created_at, updated_at
    FROM reservations
"#;

#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: String,
    event_id: Option<String>,
    notes: Option<String>,
    order_lines: String,
    consumption_type_id: String,
    total_amount_cents: i64,
    has_promo_applied: bool,
    is_paid: bool,
    is_delivered: bool,
    applied_promotions_snapshot: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = DbError;

    fn try_from(row: ReservationRow) -> DbResult<Self> {
        let order: Order = serde_json::from_str(&row.order_lines)?;
        let snapshot = row
            .applied_promotions_snapshot
            .as_deref()
            .map(serde_json::from_str::<Vec<PromotionLineSnapshot>>)
            .transpose()?;

        Ok(Reservation {
            id: row.id,
            event_id: row.event_id,
            notes: row.notes,
            order,
            consumption_type_id: row.consumption_type_id,
            total_amount_cents: row.total_amount_cents,
            has_promo_applied: row.has_promo_applied,
            is_paid: row.is_paid,
            is_delivered: row.is_delivered,
            applied_promotions_snapshot: snapshot,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for reservations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Gets an active reservation. Soft-deleted ones read as `None`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reservation>> {
        let mut conn = self.pool.acquire().await?;
        get_active_on(&mut conn, id).await
    }

    /// Active reservations of an event, oldest first.
    pub async fn list_by_event(&self, event_id: &str) -> DbResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "{SELECT_RESERVATION} WHERE event_id = ?1 AND is_active = 1 ORDER BY created_at"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    /// Inserts without touching stock. Reservation creation normally goes
    /// through the stock controller instead.
    pub async fn insert(&self, reservation: &Reservation) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_on(&mut conn, reservation).await
    }

    /// Rewrites every mutable column of an active reservation.
    pub async fn update(&self, reservation: &Reservation) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_on(&mut conn, reservation).await
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

pub(crate) async fn get_active_on(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Reservation>> {
    let row: Option<ReservationRow> = sqlx::query_as(&format!(
        "{SELECT_RESERVATION} WHERE id = ?1 AND is_active = 1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Reservation::try_from).transpose()
}

pub(crate) async fn insert_on(conn: &mut SqliteConnection, r: &Reservation) -> DbResult<()> {
    debug!(id = %r.id, total_cents = r.total_amount_cents, "Inserting reservation");

    let snapshot = r
        .applied_promotions_snapshot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, event_id, notes, order_lines, consumption_type_id,
            total_amount_cents, has_promo_applied, is_paid, is_delivered,
            applied_promotions_snapshot, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&r.id)
    .bind(&r.event_id)
    .bind(&r.notes)
    .bind(serde_json::to_string(&r.order)?)
    .bind(&r.consumption_type_id)
    .bind(r.total_amount_cents)
    .bind(r.has_promo_applied)
    .bind(r.is_paid)
    .bind(r.is_delivered)
    .bind(snapshot)
    .bind(r.is_active)
    .bind(r.created_at)
    .bind(r.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_on(conn: &mut SqliteConnection, r: &Reservation) -> DbResult<()> {
    debug!(id = %r.id, total_cents = r.total_amount_cents, "Updating reservation");

    let snapshot = r
        .applied_promotions_snapshot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE reservations SET
            event_id = ?2,
            notes = ?3,
            order_lines = ?4,
            consumption_type_id = ?5,
            total_amount_cents = ?6,
            has_promo_applied = ?7,
            is_paid = ?8,
            is_delivered = ?9,
            applied_promotions_snapshot = ?10,
            updated_at = ?11
        WHERE id = ?1 AND is_active = 1
        "#,
    )
    .bind(&r.id)
    .bind(&r.event_id)
    .bind(&r.notes)
    .bind(serde_json::to_string(&r.order)?)
    .bind(&r.consumption_type_id)
    .bind(r.total_amount_cents)
    .bind(r.has_promo_applied)
    .bind(r.is_paid)
    .bind(r.is_delivered)
    .bind(snapshot)
    .bind(r.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Reservation", &r.id));
    }
    Ok(())
}

/// Compare-and-swap write: applies `r` only while the stored row still
/// matches `expected` on every caller-editable column. Returns `false` when
/// another writer got there first, or the reservation is gone.
pub(crate) async fn update_if_unchanged_on(
    conn: &mut SqliteConnection,
    expected: &Reservation,
    r: &Reservation,
) -> DbResult<bool> {
    debug!(id = %r.id, total_cents = r.total_amount_cents, "Updating reservation (guarded)");

    let snapshot = r
        .applied_promotions_snapshot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE reservations SET
            event_id = ?2,
            notes = ?3,
            order_lines = ?4,
            consumption_type_id = ?5,
            total_amount_cents = ?6,
            has_promo_applied = ?7,
            is_paid = ?8,
            is_delivered = ?9,
            applied_promotions_snapshot = ?10,
            updated_at = ?11
        WHERE id = ?1 AND is_active = 1
          AND event_id IS ?12
          AND notes IS ?13
          AND order_lines = ?14
          AND consumption_type_id = ?15
          AND is_paid = ?16
          AND is_delivered = ?17
        "#,
    )
    .bind(&r.id)
    .bind(&r.event_id)
    .bind(&r.notes)
    .bind(serde_json::to_string(&r.order)?)
    .bind(&r.consumption_type_id)
    .bind(r.total_amount_cents)
    .bind(r.has_promo_applied)
    .bind(r.is_paid)
    .bind(r.is_delivered)
    .bind(snapshot)
    .bind(r.updated_at)
    .bind(&expected.event_id)
    .bind(&expected.notes)
    .bind(serde_json::to_string(&expected.order)?)
    .bind(&expected.consumption_type_id)
    .bind(expected.is_paid)
    .bind(expected.is_delivered)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Flips `is_active` off. Returns `false` when the reservation was already
/// inactive or missing, so callers never restore stock twice.
pub(crate) async fn deactivate_on(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE reservations SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
    )
    .bind(id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use banquet_core::ConsumptionType;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.consumption_types()
            .insert(&ConsumptionType {
                id: "buffet".to_string(),
                name: "Buffet".to_string(),
            })
            .await
            .unwrap();
        db
    }

    fn reservation(id: &str) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.to_string(),
            event_id: Some("wedding-42".to_string()),
            notes: None,
            order: Order::new().with_line("p1", 2),
            consumption_type_id: "buffet".to_string(),
            total_amount_cents: 1234,
            has_promo_applied: false,
            is_paid: false,
            is_delivered: false,
            applied_promotions_snapshot: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let db = setup().await;
        let repo = db.reservations();

        repo.insert(&reservation("r1")).await.unwrap();
        let mut loaded = repo.get_by_id("r1").await.unwrap().unwrap();
        assert_eq!(loaded.order.quantity_of("p1"), 2);
        assert_eq!(loaded.total_amount(), "12.34");

        loaded.notes = Some("no nuts".to_string());
        loaded.is_paid = true;
        repo.update(&loaded).await.unwrap();

        let reloaded = repo.get_by_id("r1").await.unwrap().unwrap();
        assert!(reloaded.is_frozen());
        assert_eq!(reloaded.notes.as_deref(), Some("no nuts"));
        assert_eq!(repo.list_by_event("wedding-42").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_consumption_type_rejected() {
        let db = setup().await;
        let mut r = reservation("r1");
        r.consumption_type_id = "picnic".to_string();

        assert!(matches!(
            db.reservations().insert(&r).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_deactivate_only_once() {
        let db = setup().await;
        db.reservations().insert(&reservation("r1")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(deactivate_on(&mut conn, "r1").await.unwrap());
        assert!(!deactivate_on(&mut conn, "r1").await.unwrap());
        assert!(get_active_on(&mut conn, "r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guarded_update_rejects_stale_expectation() {
        let db = setup().await;
        let original = reservation("r1");
        db.reservations().insert(&original).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let mut first = original.clone();
        first.order = Order::new().with_line("p1", 5);
        assert!(update_if_unchanged_on(&mut conn, &original, &first).await.unwrap());

        // Still expects the two-unit order that is no longer stored
        let mut second = original.clone();
        second.order = Order::new().with_line("p1", 1);
        assert!(!update_if_unchanged_on(&mut conn, &original, &second).await.unwrap());

        let stored = get_active_on(&mut conn, "r1").await.unwrap().unwrap();
        assert_eq!(stored.order.quantity_of("p1"), 5);

        // A NULL column compares equal to NULL
        let mut third = stored.clone();
        third.notes = Some("late arrival".to_string());
        assert!(update_if_unchanged_on(&mut conn, &stored, &third).await.unwrap());
    }
}
