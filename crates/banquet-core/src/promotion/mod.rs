//! # Promotions
//!
//! Promotion documents and the discount-rule tagged union.
//!
//! ## Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Promotion                                       │
//! │                                                                         │
//! │  id, name, priority, is_cumulative, [start_date, end_date)             │
//! │  applicables?  ──► restricts which products it may touch               │
//! │  rule ─────────► PromotionRule (tag = "rule", payload = "conditions")  │
//! │                   ├── BuyXPayY            ├── BuyXGetYFree             │
//! │                   ├── FlatAmountOffPerUnit├── MaxUnitsDiscounted       │
//! │                   ├── BundlePrice         ├── FirstNUnitsFree          │
//! │                   ├── PercentageOff       ├── TimeLimitedDiscount      │
//! │                   ├── ComboDiscount       └── FixedPriceBundle         │
//! │                                                                         │
//! │  rules.rs    - one pure evaluator per rule                             │
//! │  selector.rs - which valid promotions apply to a line                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Percentages are basis points (`1000` = 10 %), flat amounts are cents.

pub mod rules;
pub mod selector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub use rules::{evaluate, LineContext, OrderContext};
pub use selector::{select_promotions, AppliedDiscount};

// =============================================================================
// Promotion
// =============================================================================

/// A promotion attached to one or more products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub rule: PromotionRule,
    /// Higher wins among non-cumulative promotions.
    pub priority: i32,
    /// Cumulative promotions stack with everything else.
    pub is_cumulative: bool,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    /// Exclusive bound.
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    /// When present, only these products may receive the discount.
    pub applicables: Option<Vec<String>>,
}

impl Promotion {
    /// `start_date <= now < end_date`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now < self.end_date
    }

    pub fn applies_to(&self, product_id: &str) -> bool {
        self.applicables
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == product_id))
    }

    /// Valid now and applicable to the product.
    pub fn is_active_for(&self, product_id: &str, now: DateTime<Utc>) -> bool {
        self.is_valid_at(now) && self.applies_to(product_id)
    }
}

// =============================================================================
// Rule Tagged Union
// =============================================================================

/// Discount rule with its condition payload.
///
/// Serialized adjacently tagged:
/// `{"rule": "buy_x_pay_y", "conditions": {"buyQuantity": 3, "payQuantity": 2}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "rule", content = "conditions", rename_all = "snake_case")]
#[ts(export)]
pub enum PromotionRule {
    BuyXPayY(BuyXPayY),
    FlatAmountOffPerUnit(FlatAmountOff),
    BundlePrice(BundlePrice),
    PercentageOff(PercentageOff),
    ComboDiscount(ComboDiscount),
    FixedPriceBundle(FixedPriceBundle),
    BuyXGetYFree(BuyXGetYFree),
    MaxUnitsDiscounted(MaxUnitsDiscounted),
    FirstNUnitsFree(FirstNUnitsFree),
    TimeLimitedDiscount(DiscountKind),
}

impl PromotionRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            PromotionRule::BuyXPayY(_) => RuleKind::BuyXPayY,
            PromotionRule::FlatAmountOffPerUnit(_) => RuleKind::FlatAmountOffPerUnit,
            PromotionRule::BundlePrice(_) => RuleKind::BundlePrice,
            PromotionRule::PercentageOff(_) => RuleKind::PercentageOff,
            PromotionRule::ComboDiscount(_) => RuleKind::ComboDiscount,
            PromotionRule::FixedPriceBundle(_) => RuleKind::FixedPriceBundle,
            PromotionRule::BuyXGetYFree(_) => RuleKind::BuyXGetYFree,
            PromotionRule::MaxUnitsDiscounted(_) => RuleKind::MaxUnitsDiscounted,
            PromotionRule::FirstNUnitsFree(_) => RuleKind::FirstNUnitsFree,
            PromotionRule::TimeLimitedDiscount(_) => RuleKind::TimeLimitedDiscount,
        }
    }

    /// Rebuilds a rule from its stored tag and condition payload.
    pub fn from_parts(
        rule: &str,
        conditions: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({
            "rule": rule,
            "conditions": conditions,
        }))
    }

    /// Splits the rule into (tag, condition payload) for storage.
    pub fn to_parts(&self) -> Result<(RuleKind, serde_json::Value), serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        let conditions = value
            .get_mut("conditions")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
        Ok((self.kind(), conditions))
    }
}

/// The rule tag on its own, as recorded in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RuleKind {
    BuyXPayY,
    FlatAmountOffPerUnit,
    BundlePrice,
    PercentageOff,
    ComboDiscount,
    FixedPriceBundle,
    BuyXGetYFree,
    MaxUnitsDiscounted,
    FirstNUnitsFree,
    TimeLimitedDiscount,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::BuyXPayY => "buy_x_pay_y",
            RuleKind::FlatAmountOffPerUnit => "flat_amount_off_per_unit",
            RuleKind::BundlePrice => "bundle_price",
            RuleKind::PercentageOff => "percentage_off",
            RuleKind::ComboDiscount => "combo_discount",
            RuleKind::FixedPriceBundle => "fixed_price_bundle",
            RuleKind::BuyXGetYFree => "buy_x_get_y_free",
            RuleKind::MaxUnitsDiscounted => "max_units_discounted",
            RuleKind::FirstNUnitsFree => "first_n_units_free",
            RuleKind::TimeLimitedDiscount => "time_limited_discount",
        }
    }
}

// =============================================================================
// Condition Payloads
// =============================================================================

/// Pay `pay_quantity` for every `buy_quantity` units (3-for-2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BuyXPayY {
    pub buy_quantity: i64,
    pub pay_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FlatAmountOff {
    pub amount_off_cents: i64,
}

/// Every complete group of `units` costs `bundle_price_cents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BundlePrice {
    pub units: i64,
    pub bundle_price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PercentageOff {
    pub percent_bps: u32,
}

/// Discount granted only when all `required_product_ids` are in the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ComboDiscount {
    pub required_product_ids: Vec<String>,
    pub discount: DiscountKind,
}

/// A fixed set of products priced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FixedPriceBundle {
    pub product_ids: Vec<String>,
    pub bundle_price_cents: i64,
}

/// Every `buy_quantity + free_quantity` units, `free_quantity` are free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BuyXGetYFree {
    pub buy_quantity: i64,
    pub free_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MaxUnitsDiscounted {
    pub max_units: i64,
    pub discount: DiscountKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FirstNUnitsFree {
    pub units: i64,
}

/// Percent-or-flat discount shared by several rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum DiscountKind {
    Percentage {
        #[serde(rename = "percentBps")]
        percent_bps: u32,
    },
    FlatPerUnit {
        #[serde(rename = "amountOffCents")]
        amount_off_cents: i64,
    },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn promo(applicables: Option<Vec<String>>) -> Promotion {
        Promotion {
            id: "promo".to_string(),
            name: "3x2".to_string(),
            rule: PromotionRule::BuyXPayY(BuyXPayY {
                buy_quantity: 3,
                pay_quantity: 2,
            }),
            priority: 1,
            is_cumulative: false,
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            applicables,
        }
    }

    #[test]
    fn test_validity_window_is_half_open() {
        let p = promo(None);
        assert!(p.is_valid_at(p.start_date));
        assert!(p.is_valid_at(p.end_date - Duration::seconds(1)));
        assert!(!p.is_valid_at(p.end_date));
        assert!(!p.is_valid_at(p.start_date - Duration::seconds(1)));
    }

    #[test]
    fn test_applicables_restrict_products() {
        let open = promo(None);
        assert!(open.applies_to("anything"));

        let restricted = promo(Some(vec!["p1".to_string()]));
        assert!(restricted.applies_to("p1"));
        assert!(!restricted.applies_to("p2"));
        assert!(!restricted.is_active_for("p2", restricted.start_date));
    }

    #[test]
    fn test_rule_serializes_adjacently_tagged() {
        let rule = PromotionRule::BuyXPayY(BuyXPayY {
            buy_quantity: 3,
            pay_quantity: 2,
        });
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "rule": "buy_x_pay_y",
                "conditions": { "buyQuantity": 3, "payQuantity": 2 }
            })
        );
    }

    #[test]
    fn test_rule_parts_for_storage() {
        let rule = PromotionRule::MaxUnitsDiscounted(MaxUnitsDiscounted {
            max_units: 10,
            discount: DiscountKind::Percentage { percent_bps: 1500 },
        });
        let (kind, conditions) = rule.to_parts().unwrap();
        assert_eq!(kind, RuleKind::MaxUnitsDiscounted);
        assert_eq!(
            conditions["discount"],
            serde_json::json!({ "type": "percentage", "percentBps": 1500 })
        );

        let back = PromotionRule::from_parts(kind.as_str(), conditions).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_rule_kind_names_match_serde() {
        let kinds = [
            RuleKind::BuyXPayY,
            RuleKind::FlatAmountOffPerUnit,
            RuleKind::BuyXGetYFree,
            RuleKind::FirstNUnitsFree,
            RuleKind::TimeLimitedDiscount,
        ];
        for kind in kinds {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let result = PromotionRule::from_parts("half_price_tuesdays", serde_json::json!({}));
        assert!(result.is_err());
    }
}
