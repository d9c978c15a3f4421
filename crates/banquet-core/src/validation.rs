//! # Validation Module
//!
//! Checks run before an order reaches pricing and stock control.
//!
//! ## Where It Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reservation Create                                 │
//! │                                                                         │
//! │  Request schema (caller)                                               │
//! │  ├── shape, types, ids well-formed                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE                                                           │
//! │  ├── order non-empty, 1 ≤ qty ≤ 999                                    │
//! │  └── enough stock for every line                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Pricing + stock control                                               │
//! │  └── stock is decremented without a lower-bound check                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use banquet_core::validation::validate_order;
//! use banquet_core::Order;
//!
//! let order = Order::new().with_line("croquetas", 12);
//! assert!(validate_order(&order, |_| Some(50)).is_ok());
//! assert!(validate_order(&order, |_| Some(5)).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{to_minor, MAX_AMOUNT_CENTS};
use crate::promotion::{DiscountKind, Promotion, PromotionRule};
use crate::types::{Order, Product};
use crate::MAX_ITEM_QUANTITY;

/// 100 % in basis points.
const MAX_PERCENT_BPS: i64 = 10_000;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates an order against current stock.
///
/// `stock_of` returns the stock of a product, or `None` when it does not
/// exist.
pub fn validate_order<F>(order: &Order, stock_of: F) -> CoreResult<()>
where
    F: Fn(&str) -> Option<i64>,
{
    if order.is_empty() {
        return Err(ValidationError::Required {
            field: "order".to_string(),
        }
        .into());
    }

    for (product_id, quantity) in order.lines() {
        validate_quantity(quantity)?;

        let available = stock_of(product_id).ok_or_else(|| CoreError::missing("Product", product_id))?;
        if available < quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available,
                requested: quantity,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product before it is stored.
///
/// ## Rules
/// - id and name must not be empty
/// - stock must not be negative
/// - nominal price must parse and be non-negative
pub fn validate_product(product: &Product) -> CoreResult<()> {
    if product.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        }
        .into());
    }

    if product.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        }
        .into());
    }

    if product.stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    if to_minor(&product.nominal_price)? < 0 {
        return Err(ValidationError::OutOfRange {
            field: "nominalPrice".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    Ok(())
}

/// Validates a promotion before it is stored.
///
/// ## Rules
/// - id and name must not be empty
/// - unit counts lie in `0..=MAX_ITEM_QUANTITY`, divisors are at least 1
/// - `pay_quantity < buy_quantity`
/// - cent amounts lie in `0..=MAX_AMOUNT_CENTS`, percentages in `0..=100 %`
/// - combos and fixed bundles name at least one product
pub fn validate_promotion(promotion: &Promotion) -> CoreResult<()> {
    if promotion.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        }
        .into());
    }

    if promotion.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        }
        .into());
    }

    match &promotion.rule {
        PromotionRule::BuyXPayY(p) => {
            in_range("buyQuantity", p.buy_quantity, 1, MAX_ITEM_QUANTITY)?;
            in_range("payQuantity", p.pay_quantity, 0, p.buy_quantity - 1)?;
        }
        PromotionRule::FlatAmountOffPerUnit(p) => {
            in_range("amountOffCents", p.amount_off_cents, 0, MAX_AMOUNT_CENTS)?;
        }
        PromotionRule::BundlePrice(p) => {
            in_range("units", p.units, 1, MAX_ITEM_QUANTITY)?;
            in_range("bundlePriceCents", p.bundle_price_cents, 0, MAX_AMOUNT_CENTS)?;
        }
        PromotionRule::PercentageOff(p) => {
            in_range("percentBps", i64::from(p.percent_bps), 0, MAX_PERCENT_BPS)?;
        }
        PromotionRule::ComboDiscount(p) => {
            non_empty("requiredProductIds", &p.required_product_ids)?;
            validate_discount_kind(&p.discount)?;
        }
        PromotionRule::FixedPriceBundle(p) => {
            non_empty("productIds", &p.product_ids)?;
            in_range("bundlePriceCents", p.bundle_price_cents, 0, MAX_AMOUNT_CENTS)?;
        }
        PromotionRule::BuyXGetYFree(p) => {
            in_range("buyQuantity", p.buy_quantity, 0, MAX_ITEM_QUANTITY)?;
            in_range("freeQuantity", p.free_quantity, 1, MAX_ITEM_QUANTITY)?;
        }
        PromotionRule::MaxUnitsDiscounted(p) => {
            in_range("maxUnits", p.max_units, 0, MAX_ITEM_QUANTITY)?;
            validate_discount_kind(&p.discount)?;
        }
        PromotionRule::FirstNUnitsFree(p) => {
            in_range("units", p.units, 0, MAX_ITEM_QUANTITY)?;
        }
        PromotionRule::TimeLimitedDiscount(kind) => validate_discount_kind(kind)?,
    }

    Ok(())
}

fn validate_discount_kind(kind: &DiscountKind) -> ValidationResult<()> {
    match *kind {
        DiscountKind::Percentage { percent_bps } => {
            in_range("percentBps", i64::from(percent_bps), 0, MAX_PERCENT_BPS)
        }
        DiscountKind::FlatPerUnit { amount_off_cents } => {
            in_range("amountOffCents", amount_off_cents, 0, MAX_AMOUNT_CENTS)
        }
    }
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

fn non_empty(field: &str, ids: &[String]) -> ValidationResult<()> {
    if ids.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::{
        BuyXGetYFree, BuyXPayY, ComboDiscount, FlatAmountOff, MaxUnitsDiscounted, PercentageOff,
    };
    use chrono::{Duration, Utc};
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_order() {
        let stock: HashMap<&str, i64> = [("a", 10), ("b", 2)].into_iter().collect();
        let lookup = |id: &str| stock.get(id).copied();

        let ok = Order::new().with_line("a", 10).with_line("b", 1);
        assert!(validate_order(&ok, lookup).is_ok());

        let short = Order::new().with_line("b", 3);
        assert!(matches!(
            validate_order(&short, lookup),
            Err(CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));

        let unknown = Order::new().with_line("zzz", 1);
        assert!(matches!(
            validate_order(&unknown, lookup),
            Err(CoreError::MissingReferencedEntity { .. })
        ));

        let zero = Order::new().with_line("a", 0);
        assert!(matches!(
            validate_order(&zero, lookup),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        assert!(matches!(
            validate_order(&Order::new(), lookup),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_validate_product() {
        let now = Utc::now();
        let mut product = Product {
            id: "p1".to_string(),
            name: "Tortilla".to_string(),
            stock: 5,
            nominal_price: "2.50".to_string(),
            supplement: BTreeMap::new(),
            promotions: vec![],
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(validate_product(&product).is_ok());

        product.nominal_price = "-1.00".to_string();
        assert!(validate_product(&product).is_err());

        product.nominal_price = "abc".to_string();
        assert!(matches!(
            validate_product(&product),
            Err(CoreError::InvalidMoney { .. })
        ));

        product.nominal_price = "1.00".to_string();
        product.name = "  ".to_string();
        assert!(validate_product(&product).is_err());
    }

    fn promotion(rule: PromotionRule) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: "promo".to_string(),
            name: "Promo".to_string(),
            rule,
            priority: 1,
            is_cumulative: false,
            start_date: now,
            end_date: now + Duration::days(7),
            applicables: None,
        }
    }

    #[test]
    fn test_validate_promotion_accepts_sane_rules() {
        let rules = [
            PromotionRule::BuyXPayY(BuyXPayY {
                buy_quantity: 3,
                pay_quantity: 2,
            }),
            PromotionRule::PercentageOff(PercentageOff { percent_bps: 10_000 }),
            PromotionRule::BuyXGetYFree(BuyXGetYFree {
                buy_quantity: 11,
                free_quantity: 1,
            }),
            PromotionRule::MaxUnitsDiscounted(MaxUnitsDiscounted {
                max_units: 6,
                discount: DiscountKind::FlatPerUnit {
                    amount_off_cents: 100,
                },
            }),
        ];
        for rule in rules {
            assert!(validate_promotion(&promotion(rule)).is_ok());
        }
    }

    #[test]
    fn test_validate_promotion_rejects_oversized_payloads() {
        let huge_group = promotion(PromotionRule::BuyXGetYFree(BuyXGetYFree {
            buy_quantity: i64::MAX,
            free_quantity: 1,
        }));
        assert!(matches!(
            validate_promotion(&huge_group),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let huge_flat = promotion(PromotionRule::FlatAmountOffPerUnit(FlatAmountOff {
            amount_off_cents: i64::MAX / 2,
        }));
        assert!(validate_promotion(&huge_flat).is_err());

        let inverted = promotion(PromotionRule::BuyXPayY(BuyXPayY {
            buy_quantity: 2,
            pay_quantity: 2,
        }));
        assert!(validate_promotion(&inverted).is_err());

        let over_100 = promotion(PromotionRule::PercentageOff(PercentageOff { percent_bps: 10_001 }));
        assert!(validate_promotion(&over_100).is_err());

        let empty_combo = promotion(PromotionRule::ComboDiscount(ComboDiscount {
            required_product_ids: vec![],
            discount: DiscountKind::Percentage { percent_bps: 500 },
        }));
        assert!(matches!(
            validate_promotion(&empty_combo),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let mut unnamed = promotion(PromotionRule::PercentageOff(PercentageOff { percent_bps: 500 }));
        unnamed.name = " ".to_string();
        assert!(validate_promotion(&unnamed).is_err());
    }
}
