//! # Catalog Loader
//!
//! Reads exactly the part of the catalog an order needs and hands it to
//! the pure pricing engine.
//!
//! ```text
//! order {p1: 3, p2: 1}, "buffet"
//!    │
//!    ├── consumption type "buffet"      (if it exists)
//!    ├── products p1, p2                (those that exist)
//!    └── promotions attached to p1, p2  (those that exist)
//!    ▼
//! PricingCatalog ──► price_order()
//! ```
//!
//! Missing entities are left out rather than reported here; the engine
//! reports the first one it needs as a missing-entity error.
//!
//! Reads are not serialized against concurrent writers. A promotion edited
//! while an order is being priced may or may not be seen.

use std::collections::HashSet;

use banquet_core::{Order, PricingCatalog};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::consumption_type::ConsumptionTypeRepository;
use crate::repository::product::ProductRepository;
use crate::repository::promotion::PromotionRepository;

#[derive(Debug, Clone)]
pub struct CatalogLoader {
    products: ProductRepository,
    promotions: PromotionRepository,
    consumption_types: ConsumptionTypeRepository,
}

impl CatalogLoader {
    pub fn new(
        products: ProductRepository,
        promotions: PromotionRepository,
        consumption_types: ConsumptionTypeRepository,
    ) -> Self {
        CatalogLoader {
            products,
            promotions,
            consumption_types,
        }
    }

    /// Loads the catalog slice for one order.
    pub async fn load_for(&self, order: &Order, consumption_type_id: &str) -> DbResult<PricingCatalog> {
        let mut catalog = PricingCatalog::new();

        if self.consumption_types.exists(consumption_type_id).await? {
            catalog.add_consumption_type(consumption_type_id);
        }

        let mut promotion_ids = HashSet::new();
        for product_id in order.product_ids() {
            if let Some(product) = self.products.get_by_id(product_id).await? {
                promotion_ids.extend(product.promotions.iter().cloned());
                catalog.add_product(product);
            }
        }

        for promotion_id in &promotion_ids {
            if let Some(promotion) = self.promotions.get_by_id(promotion_id).await? {
                catalog.add_promotion(promotion);
            }
        }

        debug!(
            products = order.len(),
            promotions = promotion_ids.len(),
            "Catalog loaded for order"
        );

        Ok(catalog)
    }
}
