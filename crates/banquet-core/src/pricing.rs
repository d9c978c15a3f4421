//! # Pricing Engine
//!
//! Turns an order into a reservation total.
//!
//! ## Per-Line Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (product_id, qty)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  nominal price ──to_minor──► cents                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  attached promotions ──valid now & applicable──► select ──► Σ discount  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  after promo = max(0, nominal − round(Σ discount / qty))               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  final = max(0, after promo + supplement[consumption type])            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  line subtotal = final · qty  ───────────────► Σ = total              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each line is rounded exactly once; the total is the sum of rounded line
//! subtotals and is never re-derived from a rounded total.
//!
//! The engine is pure: the storage layer loads a [`PricingCatalog`] for the
//! order and passes it in.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{div_round, Money};
use crate::promotion::selector::{select_promotions, total_discount};
use crate::promotion::{LineContext, OrderContext, Promotion};
use crate::types::{AppliedPromotionEntry, Order, Product, PromotionLineSnapshot, Reservation};

// =============================================================================
// Inputs
// =============================================================================

/// Everything the engine may look up while pricing one order.
#[derive(Debug, Clone, Default)]
pub struct PricingCatalog {
    products: HashMap<String, Product>,
    promotions: HashMap<String, Promotion>,
    consumption_types: HashSet<String>,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.add_product(product);
        self
    }

    pub fn with_promotion(mut self, promotion: Promotion) -> Self {
        self.add_promotion(promotion);
        self
    }

    pub fn with_consumption_type(mut self, id: impl Into<String>) -> Self {
        self.add_consumption_type(id);
        self
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn add_promotion(&mut self, promotion: Promotion) {
        self.promotions.insert(promotion.id.clone(), promotion);
    }

    pub fn add_consumption_type(&mut self, id: impl Into<String>) {
        self.consumption_types.insert(id.into());
    }

    pub fn product(&self, id: &str) -> CoreResult<&Product> {
        self.products
            .get(id)
            .ok_or_else(|| CoreError::missing("Product", id))
    }

    /// Promotions attached to a product, in attachment order. A dangling
    /// id aborts pricing.
    pub fn promotions_of(&self, product: &Product) -> CoreResult<Vec<&Promotion>> {
        product
            .promotions
            .iter()
            .map(|id| {
                self.promotions
                    .get(id)
                    .ok_or_else(|| CoreError::missing("Promotion", id))
            })
            .collect()
    }

    pub fn has_consumption_type(&self, id: &str) -> bool {
        self.consumption_types.contains(id)
    }
}

/// One pricing call.
#[derive(Debug, Clone, Copy)]
pub struct PricingRequest<'a> {
    pub order: &'a Order,
    pub consumption_type_id: &'a str,
    pub now: DateTime<Utc>,
    pub is_paid: bool,
    pub is_delivered: bool,
    pub want_snapshot: bool,
    pub skip_freeze_check: bool,
}

impl<'a> PricingRequest<'a> {
    /// Request for a new, unfrozen order without snapshot.
    pub fn new(order: &'a Order, consumption_type_id: &'a str, now: DateTime<Utc>) -> Self {
        PricingRequest {
            order,
            consumption_type_id,
            now,
            is_paid: false,
            is_delivered: false,
            want_snapshot: false,
            skip_freeze_check: false,
        }
    }

    /// Request mirroring an existing reservation's state.
    pub fn for_reservation(reservation: &'a Reservation, now: DateTime<Utc>) -> Self {
        PricingRequest {
            order: &reservation.order,
            consumption_type_id: &reservation.consumption_type_id,
            now,
            is_paid: reservation.is_paid,
            is_delivered: reservation.is_delivered,
            want_snapshot: false,
            skip_freeze_check: false,
        }
    }

    pub fn with_snapshot(mut self) -> Self {
        self.want_snapshot = true;
        self
    }

    pub fn skip_freeze_check(mut self) -> Self {
        self.skip_freeze_check = true;
        self
    }
}

// =============================================================================
// Output
// =============================================================================

/// Pricing outcome as produced for consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingResult {
    /// Money string.
    pub total_amount: String,

    /// Same total in cents, for storage.
    #[serde(skip)]
    #[ts(skip)]
    pub total_amount_cents: i64,

    pub has_promo_applied: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_promotions_snapshot: Option<Vec<PromotionLineSnapshot>>,
}

// =============================================================================
// Engine
// =============================================================================

/// Prices an order.
///
/// ## Errors
/// - [`CoreError::PriceFrozen`] when paid/delivered and the freeze check is on
/// - [`CoreError::MissingReferencedEntity`] for an unknown consumption type,
///   product, or attached promotion
/// - [`CoreError::InvalidMoney`] for a malformed nominal price
///
/// ## Example
/// ```rust
/// use banquet_core::pricing::{price_order, PricingCatalog, PricingRequest};
/// use banquet_core::{Order, Product};
/// use chrono::Utc;
/// use std::collections::BTreeMap;
///
/// let now = Utc::now();
/// let catalog = PricingCatalog::new()
///     .with_consumption_type("buffet")
///     .with_product(Product {
///         id: "tortilla".into(),
///         name: "Tortilla".into(),
///         stock: 50,
///         nominal_price: "2.50".into(),
///         supplement: BTreeMap::new(),
///         promotions: vec![],
///         is_active: true,
///         created_at: now,
///         updated_at: now,
///     });
///
/// let order = Order::new().with_line("tortilla", 4);
/// let result = price_order(&catalog, &PricingRequest::new(&order, "buffet", now)).unwrap();
/// assert_eq!(result.total_amount, "10.00");
/// ```
pub fn price_order(catalog: &PricingCatalog, request: &PricingRequest<'_>) -> CoreResult<PricingResult> {
    if !request.skip_freeze_check && (request.is_paid || request.is_delivered) {
        return Err(CoreError::PriceFrozen);
    }

    if !catalog.has_consumption_type(request.consumption_type_id) {
        return Err(CoreError::missing(
            "ConsumptionType",
            request.consumption_type_id,
        ));
    }

    let order_ctx = OrderContext::new(request.order);
    let mut total = Money::zero();
    let mut has_promo_applied = false;
    let mut snapshot = request.want_snapshot.then(Vec::new);

    for (product_id, quantity) in request.order.lines() {
        let line = price_line(catalog, request, &order_ctx, product_id, quantity)?;

        total += line.subtotal;
        has_promo_applied |= line.discount_cents > 0;

        if let Some(lines) = snapshot.as_mut() {
            lines.push(line.snapshot);
        }
    }

    Ok(PricingResult {
        total_amount: total.to_string(),
        total_amount_cents: total.cents(),
        has_promo_applied,
        applied_promotions_snapshot: snapshot,
    })
}

struct PricedLine {
    subtotal: Money,
    discount_cents: i64,
    snapshot: PromotionLineSnapshot,
}

fn price_line(
    catalog: &PricingCatalog,
    request: &PricingRequest<'_>,
    order_ctx: &OrderContext<'_>,
    product_id: &str,
    quantity: i64,
) -> CoreResult<PricedLine> {
    let product = catalog.product(product_id)?;
    let nominal = Money::from_cents(product.nominal_price_cents()?);

    let valid: Vec<&Promotion> = catalog
        .promotions_of(product)?
        .into_iter()
        .filter(|p| p.is_active_for(product_id, request.now))
        .collect();

    let line_ctx = LineContext {
        product_id,
        unit_price_cents: nominal.cents(),
        quantity,
    };
    let applied = select_promotions(&valid, &line_ctx, order_ctx);
    let discount_cents = total_discount(&applied);

    let after_promo = (nominal - per_unit(discount_cents, quantity)).non_negative();
    let supplement = Money::from_cents(product.supplement_for(request.consumption_type_id));
    let unit_final = (after_promo + supplement).non_negative();
    let subtotal = unit_final.multiply_quantity(quantity);

    let snapshot = PromotionLineSnapshot {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        quantity,
        unit_price_original: nominal.to_string(),
        unit_price_final: unit_final.to_string(),
        line_subtotal: subtotal.to_string(),
        promotions: applied
            .iter()
            .map(|a| AppliedPromotionEntry {
                promotion_id: a.promotion.id.clone(),
                name: a.promotion.name.clone(),
                rule: a.promotion.rule.kind(),
                discount_per_unit: per_unit(a.discount_cents, quantity).to_string(),
            })
            .collect(),
    };

    Ok(PricedLine {
        subtotal,
        discount_cents,
        snapshot,
    })
}

fn per_unit(line_discount_cents: i64, quantity: i64) -> Money {
    if quantity <= 0 {
        return Money::zero();
    }
    Money::from_cents(div_round(
        i128::from(line_discount_cents),
        i128::from(quantity),
    ))
}

// =============================================================================
// Recalculation Policy
// =============================================================================

/// What an update does to a reservation's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalculation {
    /// Leave total and snapshot untouched.
    Keep,
    /// Recompute the total, no snapshot.
    Recompute,
    /// The update freezes the reservation: compute once more and persist
    /// the snapshot.
    Freeze,
}

/// Applies the update policy.
///
/// - already frozen: never recompute; changing order or consumption type
///   fails with [`CoreError::PriceFrozen`]
/// - becoming frozen: [`Recalculation::Freeze`]
/// - pricing inputs changed: [`Recalculation::Recompute`]
/// - otherwise: [`Recalculation::Keep`]
pub fn decide_recalculation(
    current: &Reservation,
    update: &crate::types::ReservationUpdate,
) -> CoreResult<Recalculation> {
    let pricing_changed = update.changes_pricing_inputs(current);

    if current.is_frozen() {
        return if pricing_changed {
            Err(CoreError::PriceFrozen)
        } else {
            Ok(Recalculation::Keep)
        };
    }

    if update.will_be_frozen(current) {
        Ok(Recalculation::Freeze)
    } else if pricing_changed {
        Ok(Recalculation::Recompute)
    } else {
        Ok(Recalculation::Keep)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
