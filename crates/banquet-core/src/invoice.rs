//! # Invoice Projector
//!
//! Billing breakdown of a reservation.
//!
//! ```text
//! reservation ──frozen & snapshot?──yes──► lines from snapshot   (Snapshot)
//!                      │                   total from reservation
//!                      no
//!                      ▼
//!               price_order(skip freeze check, with snapshot)   (Live)
//! ```
//!
//! A frozen snapshot is never re-priced, so catalog edits made after
//! payment or delivery do not show up on the invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::pricing::{price_order, PricingCatalog, PricingRequest, PricingResult};
use crate::types::{PromotionLineSnapshot, Reservation};
use crate::vat::{from_net, VatResult};

/// Where the lines of an invoice came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InvoiceSource {
    Snapshot,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_original: String,
    pub unit_price_final: String,
    pub line_subtotal: String,
    /// Sum of the per-unit discounts of the applied promotions.
    pub discount_per_unit: String,
    /// Names of the applied promotions, in application order.
    pub promotions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceBreakdown {
    pub reservation_id: String,
    pub source: InvoiceSource,
    pub lines: Vec<InvoiceLine>,
    pub total_amount: String,

    #[serde(skip)]
    #[ts(skip)]
    pub total_amount_cents: i64,

    pub has_promo_applied: bool,

    /// Total read as VAT-inclusive, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat: Option<VatResult>,
}

impl InvoiceBreakdown {
    /// Breakdown from the frozen snapshot, or `None` when the reservation
    /// is not frozen or was frozen before snapshots existed.
    pub fn from_snapshot(reservation: &Reservation) -> CoreResult<Option<Self>> {
        let snapshot = match (&reservation.applied_promotions_snapshot, reservation.is_frozen()) {
            (Some(snapshot), true) => snapshot,
            _ => return Ok(None),
        };

        Ok(Some(InvoiceBreakdown {
            reservation_id: reservation.id.clone(),
            source: InvoiceSource::Snapshot,
            lines: lines_of(snapshot)?,
            total_amount: reservation.total_amount(),
            total_amount_cents: reservation.total_amount_cents,
            has_promo_applied: reservation.has_promo_applied,
            vat: None,
        }))
    }

    /// Breakdown from a fresh pricing run. The result must carry a
    /// snapshot; one without yields an invoice with no lines.
    pub fn from_pricing(reservation: &Reservation, result: &PricingResult) -> CoreResult<Self> {
        let lines = match &result.applied_promotions_snapshot {
            Some(snapshot) => lines_of(snapshot)?,
            None => Vec::new(),
        };

        Ok(InvoiceBreakdown {
            reservation_id: reservation.id.clone(),
            source: InvoiceSource::Live,
            lines,
            total_amount: result.total_amount.clone(),
            total_amount_cents: result.total_amount_cents,
            has_promo_applied: result.has_promo_applied,
            vat: None,
        })
    }

    /// Adds the VAT split of the total, read as the net (VAT-inclusive)
    /// price.
    pub fn with_vat(mut self, vat_pct: u32) -> CoreResult<Self> {
        self.vat = Some(from_net(self.total_amount_cents, vat_pct)?.to_result());
        Ok(self)
    }
}

/// Projects the invoice of a reservation.
///
/// The catalog is only consulted on the live path.
pub fn project_invoice(
    reservation: &Reservation,
    catalog: &PricingCatalog,
    now: DateTime<Utc>,
) -> CoreResult<InvoiceBreakdown> {
    if let Some(invoice) = InvoiceBreakdown::from_snapshot(reservation)? {
        return Ok(invoice);
    }

    let request = PricingRequest::for_reservation(reservation, now)
        .skip_freeze_check()
        .with_snapshot();
    let result = price_order(catalog, &request)?;
    InvoiceBreakdown::from_pricing(reservation, &result)
}

fn lines_of(snapshot: &[PromotionLineSnapshot]) -> CoreResult<Vec<InvoiceLine>> {
    snapshot
        .iter()
        .map(|line| {
            let mut discount = Money::zero();
            for entry in &line.promotions {
                discount += Money::parse(&entry.discount_per_unit)?;
            }

            Ok(InvoiceLine {
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_original: line.unit_price_original.clone(),
                unit_price_final: line.unit_price_final.clone(),
                line_subtotal: line.line_subtotal.clone(),
                discount_per_unit: discount.to_string(),
                promotions: line.promotions.iter().map(|p| p.name.clone()).collect(),
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
