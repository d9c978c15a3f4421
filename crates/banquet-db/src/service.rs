//! # Reservation Service
//!
//! Create, update, delete and invoice reservations. The service owns the
//! order of operations; the math lives in `banquet-core`.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewReservation                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CatalogLoader::load_for(order, consumption type)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_order (quantities, stock)  ── InsufficientStock               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_order  ── total, promo flag, snapshot if created frozen          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockController::create_with_stock_control                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Update
//! ```text
//! decide_recalculation(current, update)
//!   Keep       → write non-pricing fields only
//!   Recompute  → price again, no snapshot
//!   Freeze     → price once more, store the snapshot
//!   PriceFrozen error when a frozen reservation's order/type would change
//! Order changed → stock moves by the difference, in the same transaction
//! ```
//!
//! The write only lands if the stored row still matches the version the
//! update was decided on. A concurrent writer turns it into a `Conflict`,
//! and the whole read-decide-price-write cycle runs again on fresh data,
//! at most [`MAX_UPDATE_ATTEMPTS`] times.

use banquet_core::validation::validate_order;
use banquet_core::{
    decide_recalculation, price_order, project_invoice, InvoiceBreakdown, Order, PricingCatalog,
    PricingRequest, Recalculation, Reservation, ReservationUpdate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// Read-decide-write cycles `update` runs before giving up on a
/// reservation that keeps changing underneath it.
pub const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Input for a new reservation. Totals are always computed here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub event_id: Option<String>,
    pub notes: Option<String>,
    pub order: Order,
    pub consumption_type_id: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_delivered: bool,
}

#[derive(Debug, Clone)]
pub struct ReservationService {
    db: Database,
}

impl ReservationService {
    pub fn new(db: Database) -> Self {
        ReservationService { db }
    }

    /// Gets an active reservation.
    pub async fn get(&self, id: &str) -> DbResult<Reservation> {
        self.db
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Prices, reserves stock and stores a new reservation.
    ///
    /// A reservation created already paid or delivered is frozen from the
    /// start and gets its snapshot immediately.
    pub async fn create(&self, draft: NewReservation, now: DateTime<Utc>) -> DbResult<Reservation> {
        let catalog = self
            .db
            .catalog()
            .load_for(&draft.order, &draft.consumption_type_id)
            .await?;

        validate_order(&draft.order, |id| stock_in(&catalog, id))?;

        let frozen = draft.is_paid || draft.is_delivered;
        let request = PricingRequest {
            order: &draft.order,
            consumption_type_id: &draft.consumption_type_id,
            now,
            is_paid: draft.is_paid,
            is_delivered: draft.is_delivered,
            want_snapshot: frozen,
            skip_freeze_check: true,
        };
        let priced = price_order(&catalog, &request)?;

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            event_id: draft.event_id,
            notes: draft.notes,
            order: draft.order,
            consumption_type_id: draft.consumption_type_id,
            total_amount_cents: priced.total_amount_cents,
            has_promo_applied: priced.has_promo_applied,
            is_paid: draft.is_paid,
            is_delivered: draft.is_delivered,
            applied_promotions_snapshot: priced.applied_promotions_snapshot,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db
            .stock()
            .create_with_stock_control(&reservation)
            .await?;

        info!(
            reservation_id = %reservation.id,
            total = %reservation.total_amount(),
            promo = reservation.has_promo_applied,
            frozen = frozen,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Applies a partial update under the recalculation policy.
    ///
    /// Concurrent updates to the same reservation are serialized: each one
    /// is decided against the state it actually replaces.
    pub async fn update(
        &self,
        id: &str,
        update: ReservationUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<Reservation> {
        let mut attempt = 1;
        loop {
            match self.try_update(id, &update, now).await {
                Err(DbError::Conflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                    warn!(
                        reservation_id = %id,
                        attempt = attempt,
                        "Reservation changed concurrently, retrying update"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_update(
        &self,
        id: &str,
        update: &ReservationUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<Reservation> {
        let current = self.get(id).await?;
        let decision = decide_recalculation(&current, update)?;
        let order_changed = update
            .order
            .as_ref()
            .is_some_and(|order| *order != current.order);

        let mut next = current.clone();
        update.apply_to(&mut next);
        next.updated_at = now;

        debug!(reservation_id = %id, decision = ?decision, "Recalculation decided");

        if decision != Recalculation::Keep {
            let catalog = self
                .db
                .catalog()
                .load_for(&next.order, &next.consumption_type_id)
                .await?;

            if order_changed {
                // Units already held by this reservation count as available.
                validate_order(&next.order, |pid| {
                    stock_in(&catalog, pid).map(|stock| stock + current.order.quantity_of(pid))
                })?;
            }

            let mut request = PricingRequest::for_reservation(&next, now).skip_freeze_check();
            request.want_snapshot = decision == Recalculation::Freeze;
            let priced = price_order(&catalog, &request)?;

            next.total_amount_cents = priced.total_amount_cents;
            next.has_promo_applied = priced.has_promo_applied;
            if decision == Recalculation::Freeze {
                next.applied_promotions_snapshot = priced.applied_promotions_snapshot;
            }
        }

        self.db
            .stock()
            .update_with_stock_adjust(&current, &next)
            .await?;

        info!(
            reservation_id = %id,
            decision = ?decision,
            total = %next.total_amount(),
            "Reservation updated"
        );
        Ok(next)
    }

    /// Soft-deletes a reservation and restores its stock.
    pub async fn delete(&self, id: &str) -> DbResult<Reservation> {
        self.db.stock().delete_with_stock_restore(id).await
    }

    /// Billing breakdown, optionally with the VAT split at the configured
    /// default rate.
    pub async fn invoice(
        &self,
        id: &str,
        include_vat: bool,
        now: DateTime<Utc>,
    ) -> DbResult<InvoiceBreakdown> {
        let reservation = self.get(id).await?;

        let invoice = match InvoiceBreakdown::from_snapshot(&reservation)? {
            Some(invoice) => invoice,
            None => {
                let catalog = self
                    .db
                    .catalog()
                    .load_for(&reservation.order, &reservation.consumption_type_id)
                    .await?;
                project_invoice(&reservation, &catalog, now)?
            }
        };

        debug!(reservation_id = %id, source = ?invoice.source, "Invoice projected");

        if include_vat {
            Ok(invoice.with_vat(self.db.default_vat_pct())?)
        } else {
            Ok(invoice)
        }
    }
}

fn stock_in(catalog: &PricingCatalog, product_id: &str) -> Option<i64> {
    catalog.product(product_id).ok().map(|p| p.stock)
}

// =============================================================================
// Unit Tests
// =============================================================================
