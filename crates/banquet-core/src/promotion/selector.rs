//! # Promotion Selector
//!
//! Decides which of the currently valid promotions apply to a line.
//!
//! ## Selection
//! ```text
//! valid promotions for the product
//!      │
//!      ├── cumulative ──────────────────────────────► all applied
//!      │
//!      └── non-cumulative
//!             │
//!             ▼
//!          highest priority
//!             │  tie?
//!             ▼
//!          largest discount for THIS line (strictly larger wins)
//!             │  tie?
//!             ▼
//!          first in input order ───────────────────► one applied
//! ```

use std::collections::HashSet;

use super::rules::{evaluate, LineContext, OrderContext};
use super::Promotion;

/// A promotion chosen for a line, with the discount it grants.
#[derive(Debug, Clone, Copy)]
pub struct AppliedDiscount<'a> {
    pub promotion: &'a Promotion,
    pub discount_cents: i64,
}

/// Selects the applied set for a line.
///
/// `candidates` must already be filtered to promotions valid now for this
/// product. Duplicate ids are collapsed to their first occurrence so no
/// promotion applies twice. The winning non-cumulative promotion (if any)
/// comes first, followed by the cumulative ones in input order.
pub fn select_promotions<'a>(
    candidates: &[&'a Promotion],
    line: &LineContext<'_>,
    order: &OrderContext<'_>,
) -> Vec<AppliedDiscount<'a>> {
    let mut seen = HashSet::new();
    let unique: Vec<&'a Promotion> = candidates
        .iter()
        .copied()
        .filter(|p| seen.insert(p.id.as_str()))
        .collect();

    let (cumulative, exclusive): (Vec<&'a Promotion>, Vec<&'a Promotion>) =
        unique.into_iter().partition(|p| p.is_cumulative);

    let mut applied = Vec::with_capacity(cumulative.len() + 1);

    if let Some(winner) = pick_exclusive(&exclusive, line, order) {
        applied.push(winner);
    }

    applied.extend(cumulative.into_iter().map(|promotion| AppliedDiscount {
        promotion,
        discount_cents: evaluate(&promotion.rule, line, order),
    }));

    applied
}

/// Sum of the discounts of an applied set.
pub fn total_discount(applied: &[AppliedDiscount<'_>]) -> i64 {
    applied
        .iter()
        .fold(0i64, |sum, a| sum.saturating_add(a.discount_cents))
}

fn pick_exclusive<'a>(
    exclusive: &[&'a Promotion],
    line: &LineContext<'_>,
    order: &OrderContext<'_>,
) -> Option<AppliedDiscount<'a>> {
    let top_priority = exclusive.iter().map(|p| p.priority).max()?;

    let mut best: Option<AppliedDiscount<'a>> = None;
    for promotion in exclusive.iter().copied().filter(|p| p.priority == top_priority) {
        let discount_cents = evaluate(&promotion.rule, line, order);
        // Strictly larger only: on a tie the earlier candidate stays.
        if best.map_or(true, |b| discount_cents > b.discount_cents) {
            best = Some(AppliedDiscount {
                promotion,
                discount_cents,
            });
        }
    }
    best
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::{FlatAmountOff, PercentageOff, PromotionRule};
    use crate::types::Order;
    use chrono::{Duration, Utc};

    fn promo(id: &str, rule: PromotionRule, priority: i32, cumulative: bool) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: id.to_string(),
            name: id.to_string(),
            rule,
            priority,
            is_cumulative: cumulative,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            applicables: None,
        }
    }

    fn flat(cents: i64) -> PromotionRule {
        PromotionRule::FlatAmountOffPerUnit(FlatAmountOff {
            amount_off_cents: cents,
        })
    }

    fn pct(bps: u32) -> PromotionRule {
        PromotionRule::PercentageOff(PercentageOff { percent_bps: bps })
    }

    fn ids(applied: &[AppliedDiscount<'_>]) -> Vec<String> {
        applied.iter().map(|a| a.promotion.id.clone()).collect()
    }

    const LINE: LineContext<'static> = LineContext {
        product_id: "p1",
        unit_price_cents: 1000,
        quantity: 2,
    };

    #[test]
    fn test_highest_priority_wins() {
        let order = Order::new().with_line("p1", 2);
        let ctx = OrderContext::new(&order);
        let low = promo("low", flat(400), 1, false);
        let high = promo("high", flat(100), 5, false);

        let applied = select_promotions(&[&low, &high], &LINE, &ctx);
        assert_eq!(ids(&applied), vec!["high"]);
        assert_eq!(total_discount(&applied), 200);
    }

    #[test]
    fn test_priority_tie_takes_strictly_larger_discount() {
        let order = Order::new().with_line("p1", 2);
        let ctx = OrderContext::new(&order);
        let ten_pct = promo("ten", pct(1000), 3, false);
        let flat_150 = promo("flat", flat(150), 3, false);

        // 10 % of 20.00 = 200, flat 1.50 × 2 = 300
        let applied = select_promotions(&[&ten_pct, &flat_150], &LINE, &ctx);
        assert_eq!(ids(&applied), vec!["flat"]);
        assert_eq!(total_discount(&applied), 300);
    }

    #[test]
    fn test_discount_tie_keeps_input_order() {
        let order = Order::new().with_line("p1", 2);
        let ctx = OrderContext::new(&order);
        let a = promo("a", flat(100), 3, false);
        let b = promo("b", pct(1000), 3, false);

        let applied = select_promotions(&[&a, &b], &LINE, &ctx);
        assert_eq!(ids(&applied), vec!["a"]);

        let applied = select_promotions(&[&b, &a], &LINE, &ctx);
        assert_eq!(ids(&applied), vec!["b"]);
    }

    #[test]
    fn test_cumulative_stack_with_winner() {
        let order = Order::new().with_line("p1", 2);
        let ctx = OrderContext::new(&order);
        let exclusive = promo("excl", flat(100), 1, false);
        let stack_a = promo("stack-a", flat(50), 0, true);
        let stack_b = promo("stack-b", pct(500), 9, true);

        let applied = select_promotions(&[&stack_a, &exclusive, &stack_b], &LINE, &ctx);
        assert_eq!(ids(&applied), vec!["excl", "stack-a", "stack-b"]);
        // 200 + 100 + 100
        assert_eq!(total_discount(&applied), 400);
    }

    #[test]
    fn test_only_cumulative() {
        let order = Order::new().with_line("p1", 2);
        let ctx = OrderContext::new(&order);
        let stack = promo("stack", flat(10), 0, true);

        let applied = select_promotions(&[&stack], &LINE, &ctx);
        assert_eq!(ids(&applied), vec!["stack"]);
        assert_eq!(total_discount(&applied), 20);
    }

    #[test]
    fn test_duplicates_apply_once() {
        let order = Order::new().with_line("p1", 2);
        let ctx = OrderContext::new(&order);
        let stack = promo("stack", flat(10), 0, true);

        let applied = select_promotions(&[&stack, &stack], &LINE, &ctx);
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let order = Order::new();
        let ctx = OrderContext::new(&order);
        assert!(select_promotions(&[], &LINE, &ctx).is_empty());
    }
}
