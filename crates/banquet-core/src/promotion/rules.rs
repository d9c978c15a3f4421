//! # Promotion Rule Evaluators
//!
//! One pure function per rule: `(unit price, quantity, params) → discount`
//! for the whole line, in cents.
//!
//! ## Arithmetic Rules
//! - Unit-count divisions use floor (integer division on non-negative values)
//! - Money roundings go through [`crate::money::div_round`] (half away from zero)
//! - Degenerate parameters (zero divisors, `pay >= buy`) give no discount
//! - A discount is never negative
//! - Amounts go through [`Money`], so oversized payloads saturate instead of
//!   overflowing
//!
//! ## Example
//! ```rust
//! use banquet_core::promotion::rules::{buy_x_pay_y, buy_x_get_y_free};
//! use banquet_core::promotion::{BuyXGetYFree, BuyXPayY};
//!
//! let three_for_two = BuyXPayY { buy_quantity: 3, pay_quantity: 2 };
//! assert_eq!(buy_x_pay_y(450, 3, &three_for_two), 450);
//! assert_eq!(buy_x_pay_y(450, 5, &three_for_two), 450);
//!
//! let two_plus_one = BuyXGetYFree { buy_quantity: 2, free_quantity: 1 };
//! assert_eq!(buy_x_get_y_free(100, 6, &two_plus_one), 200);
//! ```

use crate::money::Money;
use crate::types::Order;

use super::{
    BundlePrice, BuyXGetYFree, BuyXPayY, ComboDiscount, DiscountKind, FirstNUnitsFree,
    FixedPriceBundle, FlatAmountOff, MaxUnitsDiscounted, PercentageOff, PromotionRule,
};

// =============================================================================
// Evaluation Context
// =============================================================================

/// The order line being priced.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub product_id: &'a str,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// Read-only view of the sibling lines of the order.
///
/// Only [`ComboDiscount`] looks at it. Rules never see the raw order.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    order: &'a Order,
}

impl<'a> OrderContext<'a> {
    pub fn new(order: &'a Order) -> Self {
        OrderContext { order }
    }

    /// Every id is ordered with a positive quantity.
    pub fn contains_all(&self, product_ids: &[String]) -> bool {
        product_ids
            .iter()
            .all(|id| self.order.quantity_of(id) > 0)
    }
}

/// Evaluates a rule for one line.
pub fn evaluate(rule: &PromotionRule, line: &LineContext<'_>, order: &OrderContext<'_>) -> i64 {
    let (price, qty) = (line.unit_price_cents, line.quantity);
    if qty <= 0 || price <= 0 {
        return 0;
    }

    let discount = match rule {
        PromotionRule::BuyXPayY(p) => buy_x_pay_y(price, qty, p),
        PromotionRule::FlatAmountOffPerUnit(p) => flat_amount_off_per_unit(qty, p),
        PromotionRule::BundlePrice(p) => bundle_price(price, qty, p),
        PromotionRule::PercentageOff(p) => percentage_off(price, qty, p),
        PromotionRule::ComboDiscount(p) => combo_discount(price, qty, p, order),
        PromotionRule::FixedPriceBundle(p) => fixed_price_bundle(p),
        PromotionRule::BuyXGetYFree(p) => buy_x_get_y_free(price, qty, p),
        PromotionRule::MaxUnitsDiscounted(p) => max_units_discounted(price, qty, p),
        PromotionRule::FirstNUnitsFree(p) => first_n_units_free(price, qty, p),
        PromotionRule::TimeLimitedDiscount(kind) => time_limited_discount(price, qty, kind),
    };

    discount.max(0)
}

// =============================================================================
// Rules
// =============================================================================

/// `floor(qty / buy) · (buy − pay) · unit_price`
pub fn buy_x_pay_y(unit_price: i64, qty: i64, p: &BuyXPayY) -> i64 {
    if p.buy_quantity <= 0 || p.pay_quantity < 0 || p.pay_quantity >= p.buy_quantity {
        return 0;
    }
    let free_units = (qty / p.buy_quantity).saturating_mul(p.buy_quantity - p.pay_quantity);
    gross(unit_price, free_units)
}

/// `amount_off · qty`
pub fn flat_amount_off_per_unit(qty: i64, p: &FlatAmountOff) -> i64 {
    gross(p.amount_off_cents, qty)
}

/// `floor(qty / units) · (unit_price · units − bundle_price)`
///
/// A bundle price above the regular price of the group gives nothing.
pub fn bundle_price(unit_price: i64, qty: i64, p: &BundlePrice) -> i64 {
    if p.units <= 0 {
        return 0;
    }
    let regular = Money::from_cents(unit_price).multiply_quantity(p.units);
    let saving_per_bundle = regular - Money::from_cents(p.bundle_price_cents);
    if saving_per_bundle.cents() <= 0 {
        return 0;
    }
    saving_per_bundle.multiply_quantity(qty / p.units).cents()
}

/// `round(unit_price · qty · percent / 100)`
pub fn percentage_off(unit_price: i64, qty: i64, p: &PercentageOff) -> i64 {
    percent_of(unit_price, qty, p.percent_bps)
}

/// Applies `discount` only when every required product is in the order.
pub fn combo_discount(
    unit_price: i64,
    qty: i64,
    p: &ComboDiscount,
    order: &OrderContext<'_>,
) -> i64 {
    if !order.contains_all(&p.required_product_ids) {
        return 0;
    }
    apply_discount_kind(unit_price, qty, &p.discount)
}

/// Always zero.
///
/// Pricing a fixed set of products together needs every line of the bundle
/// at once, and a per-line evaluator only sees its own line. Until an
/// order-level pass distributes the bundle discount, this rule is inert.
pub fn fixed_price_bundle(_p: &FixedPriceBundle) -> i64 {
    0
}

/// `floor(qty / (buy + free)) · free · unit_price`
pub fn buy_x_get_y_free(unit_price: i64, qty: i64, p: &BuyXGetYFree) -> i64 {
    if p.buy_quantity < 0 || p.free_quantity <= 0 {
        return 0;
    }
    let group = p.buy_quantity.saturating_add(p.free_quantity);
    let free_units = (qty / group).saturating_mul(p.free_quantity);
    gross(unit_price, free_units)
}

/// Percent-or-flat applied to `min(qty, max_units)` units only.
pub fn max_units_discounted(unit_price: i64, qty: i64, p: &MaxUnitsDiscounted) -> i64 {
    let discounted_units = qty.min(p.max_units.max(0));
    apply_discount_kind(unit_price, discounted_units, &p.discount)
}

/// `min(qty, n) · unit_price`
pub fn first_n_units_free(unit_price: i64, qty: i64, p: &FirstNUnitsFree) -> i64 {
    gross(unit_price, qty.min(p.units.max(0)))
}

/// Same shape as percentage-off or flat-off; the time window is enforced
/// by promotion validity, not here.
pub fn time_limited_discount(unit_price: i64, qty: i64, kind: &DiscountKind) -> i64 {
    apply_discount_kind(unit_price, qty, kind)
}

// =============================================================================
// Helpers
// =============================================================================

fn apply_discount_kind(unit_price: i64, units: i64, kind: &DiscountKind) -> i64 {
    match *kind {
        DiscountKind::Percentage { percent_bps } => percent_of(unit_price, units, percent_bps),
        DiscountKind::FlatPerUnit { amount_off_cents } => gross(amount_off_cents, units),
    }
}

fn gross(unit_cents: i64, units: i64) -> i64 {
    Money::from_cents(unit_cents).multiply_quantity(units).cents()
}

fn percent_of(unit_cents: i64, units: i64, bps: u32) -> i64 {
    Money::from_cents(unit_cents)
        .multiply_quantity(units)
        .percentage(bps)
        .cents()
}

// =============================================================================
// Unit Tests
// =============================================================================
