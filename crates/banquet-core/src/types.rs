//! # Domain Types
//!
//! Catalog and reservation types shared by the pricing core and the
//! storage layer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Reservation   │   │ ConsumptionType │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  nominal_price  │   │  order          │   │  id             │       │
//! │  │  supplement{}   │   │  total (cents)  │   │  name           │       │
//! │  │  promotions[]   │   │  is_paid/deliv. │   └─────────────────┘       │
//! │  │  stock          │   │  snapshot?      │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  Order: product id → quantity    PromotionLineSnapshot: frozen line    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promotions live in [`crate::promotion`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{from_minor, to_minor};
use crate::promotion::RuleKind;

// =============================================================================
// Product
// =============================================================================

/// A catalog product that can be reserved for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Display name, frozen into snapshots.
    pub name: String,

    /// Units available. Only the stock controller changes this.
    pub stock: i64,

    /// Price per unit as a money string ("10.00").
    pub nominal_price: String,

    /// Per-consumption-type price adjustment in cents.
    #[serde(default)]
    pub supplement: BTreeMap<String, i64>,

    /// Attached promotion ids.
    #[serde(default)]
    pub promotions: Vec<String>,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Nominal price in cents.
    pub fn nominal_price_cents(&self) -> CoreResult<i64> {
        to_minor(&self.nominal_price)
    }

    /// Supplement for a consumption type. Missing entries are zero.
    pub fn supplement_for(&self, consumption_type_id: &str) -> i64 {
        self.supplement
            .get(consumption_type_id)
            .copied()
            .unwrap_or(0)
    }
}

// =============================================================================
// Consumption Type
// =============================================================================

/// How the products of a reservation are consumed (buffet, seated,
/// take-away...). Selects the product supplement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConsumptionType {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Order
// =============================================================================

/// Product id → quantity.
///
/// Backed by a `BTreeMap` so lines are always visited in product-id order;
/// snapshots and totals are therefore deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order(BTreeMap<String, i64>);

impl Order {
    pub fn new() -> Self {
        Order(BTreeMap::new())
    }

    /// Builder-style line insertion.
    ///
    /// ```rust
    /// use banquet_core::Order;
    ///
    /// let order = Order::new().with_line("croquetas", 40).with_line("cava", 12);
    /// assert_eq!(order.quantity_of("cava"), 12);
    /// ```
    pub fn with_line(mut self, product_id: impl Into<String>, quantity: i64) -> Self {
        self.0.insert(product_id.into(), quantity);
        self
    }

    pub fn insert(&mut self, product_id: impl Into<String>, quantity: i64) {
        self.0.insert(product_id.into(), quantity);
    }

    /// Quantity ordered for a product, zero when absent.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.0.get(product_id).copied().unwrap_or(0)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for Order {
    fn from_iter<T: IntoIterator<Item = (String, i64)>>(iter: T) -> Self {
        Order(iter.into_iter().collect())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// One promotion applied to a snapshot line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppliedPromotionEntry {
    pub promotion_id: String,
    pub name: String,
    pub rule: RuleKind,
    /// Money string, `round(line discount / quantity)`.
    pub discount_per_unit: String,
}

/// Pricing of one order line, frozen when the reservation is paid or
/// delivered. Later catalog edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PromotionLineSnapshot {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_original: String,
    pub unit_price_final: String,
    pub line_subtotal: String,
    pub promotions: Vec<AppliedPromotionEntry>,
}

// =============================================================================
// Reservation
// =============================================================================

/// A customer reservation for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Reservation {
    pub id: String,

    /// Opaque pass-through reference to the event.
    pub event_id: Option<String>,

    pub notes: Option<String>,

    pub order: Order,

    pub consumption_type_id: String,

    /// Server-computed total. Never taken from the client.
    pub total_amount_cents: i64,

    pub has_promo_applied: bool,

    pub is_paid: bool,

    pub is_delivered: bool,

    /// Written once, when the reservation becomes frozen.
    pub applied_promotions_snapshot: Option<Vec<PromotionLineSnapshot>>,

    /// Soft-delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Paid or delivered reservations keep their price forever.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.is_paid || self.is_delivered
    }

    /// Total as a money string.
    pub fn total_amount(&self) -> String {
        from_minor(self.total_amount_cents)
    }
}

/// Partial update of a reservation. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReservationUpdate {
    pub order: Option<Order>,
    pub consumption_type_id: Option<String>,
    pub is_paid: Option<bool>,
    pub is_delivered: Option<bool>,
    pub event_id: Option<String>,
    pub notes: Option<String>,
}

impl ReservationUpdate {
    /// True when the update changes something the price depends on.
    pub fn changes_pricing_inputs(&self, current: &Reservation) -> bool {
        let order_changed = self.order.as_ref().is_some_and(|o| *o != current.order);
        let type_changed = self
            .consumption_type_id
            .as_ref()
            .is_some_and(|c| *c != current.consumption_type_id);
        order_changed || type_changed
    }

    /// Whether the reservation is frozen once this update is applied.
    pub fn will_be_frozen(&self, current: &Reservation) -> bool {
        self.is_paid.unwrap_or(current.is_paid) || self.is_delivered.unwrap_or(current.is_delivered)
    }

    /// Copies the non-pricing fields and pricing inputs onto `target`.
    /// Totals and snapshots are left to the caller.
    pub fn apply_to(&self, target: &mut Reservation) {
        if let Some(order) = &self.order {
            target.order = order.clone();
        }
        if let Some(ct) = &self.consumption_type_id {
            target.consumption_type_id = ct.clone();
        }
        if let Some(paid) = self.is_paid {
            target.is_paid = paid;
        }
        if let Some(delivered) = self.is_delivered {
            target.is_delivered = delivered;
        }
        if let Some(event_id) = &self.event_id {
            target.event_id = Some(event_id.clone());
        }
        if let Some(notes) = &self.notes {
            target.notes = Some(notes.clone());
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Mini burger".to_string(),
            stock: 10,
            nominal_price: "10.00".to_string(),
            supplement: BTreeMap::from([("buffet".to_string(), 200)]),
            promotions: vec![],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn reservation(order: Order) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: "r1".to_string(),
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

    #[test]
    fn test_supplement_defaults_to_zero() {
        let p = product();
        assert_eq!(p.supplement_for("buffet"), 200);
        assert_eq!(p.supplement_for("seated"), 0);
        assert_eq!(p.nominal_price_cents().unwrap(), 1000);
    }

    #[test]
    fn test_order_is_sorted_and_serializes_as_map() {
        let order = Order::new().with_line("b", 2).with_line("a", 1);
        let ids: Vec<&str> = order.product_ids().collect();
        assert_eq!(ids, vec!["a", "b"]);

        let json = serde_json::to_string(&order).unwrap();
        assert_eq!(json, r#"{"a":1,"b":2}"#);
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_update_detects_pricing_changes() {
        let current = reservation(Order::new().with_line("a", 1));

        let same = ReservationUpdate {
            order: Some(Order::new().with_line("a", 1)),
            ..Default::default()
        };
        assert!(!same.changes_pricing_inputs(&current));

        let new_type = ReservationUpdate {
            consumption_type_id: Some("seated".to_string()),
            ..Default::default()
        };
        assert!(new_type.changes_pricing_inputs(&current));

        let pay = ReservationUpdate {
            is_paid: Some(true),
            ..Default::default()
        };
        assert!(!current.is_frozen());
        assert!(pay.will_be_frozen(&current));
    }

    #[test]
    fn test_apply_update() {
        let mut r = reservation(Order::new().with_line("a", 1));
        let update = ReservationUpdate {
            order: Some(Order::new().with_line("b", 3)),
            is_delivered: Some(true),
            notes: Some("terrace".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut r);
        assert_eq!(r.order.quantity_of("b"), 3);
        assert!(r.is_frozen());
        assert_eq!(r.notes.as_deref(), Some("terrace"));
        assert_eq!(r.consumption_type_id, "buffet");
    }
}
