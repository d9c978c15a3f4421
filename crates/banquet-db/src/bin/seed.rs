//! # Seed Data Generator
//!
//! Populates a database with a small catering catalog and prices one
//! reservation against it.
//!
//! ## Usage
//! ```bash
//! # Database from BANQUET_DATABASE_PATH (default ./banquet.db)
//! cargo run -p banquet-db --bin seed
//!
//! # Explicit path, verbose logs
//! RUST_LOG=banquet_db=debug cargo run -p banquet-db --bin seed -- --db ./data/banquet.db
//! ```
//!
//! ## Generated Data
//! - Consumption types: buffet, seated, takeaway
//! - Products with per-type supplements
//! - One promotion per common rule shape (3x2, percentage, combo, ...)
//! - One reservation, priced and stock-reserved

use std::collections::BTreeMap;
use std::env;

use banquet_core::promotion::{
    BuyXGetYFree, BuyXPayY, ComboDiscount, DiscountKind, FlatAmountOff, MaxUnitsDiscounted,
    PercentageOff,
};
use banquet_core::{ConsumptionType, Order, Product, Promotion, PromotionRule};
use banquet_db::{Database, DbConfig, NewReservation};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONSUMPTION_TYPES: &[(&str, &str)] = &[
    ("buffet", "Buffet"),
    ("seated", "Seated dinner"),
    ("takeaway", "Take-away"),
];

/// (id, name, price, stock, buffet supplement, seated supplement, takeaway supplement)
const PRODUCTS: &[(&str, &str, &str, i64, i64, i64, i64)] = &[
    ("croquetas", "Croquetas de jamón", "10.00", 200, 200, 350, -50),
    ("tortilla", "Tortilla de patatas", "2.50", 150, 0, 100, 0),
    ("salmorejo", "Salmorejo", "3.20", 80, 50, 120, 0),
    ("queso", "Tabla de quesos", "14.00", 40, 0, 200, 0),
    ("vino", "Vino tinto (botella)", "9.90", 120, 0, 0, -100),
    ("cava", "Cava brut (botella)", "7.50", 90, 0, 0, -50),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut config = DbConfig::from_env()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.database_path = path.into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Banquet Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $BANQUET_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let db = Database::new(config).await?;

    if !db.products().list_active().await?.is_empty() {
        warn!("Database already has products; skipping seed");
        return Ok(());
    }

    for (id, name) in CONSUMPTION_TYPES {
        db.consumption_types()
            .insert(&ConsumptionType {
                id: id.to_string(),
                name: name.to_string(),
            })
            .await?;
    }

    let now = Utc::now();
    for (id, name, price, stock, buffet, seated, takeaway) in PRODUCTS {
        let supplement: BTreeMap<String, i64> = [
            ("buffet", *buffet),
            ("seated", *seated),
            ("takeaway", *takeaway),
        ]
        .into_iter()
        .filter(|(_, cents)| *cents != 0)
        .map(|(ct, cents)| (ct.to_string(), cents))
        .collect();

        db.products()
            .insert(&Product {
                id: id.to_string(),
                name: name.to_string(),
                stock: *stock,
                nominal_price: price.to_string(),
                supplement,
                promotions: vec![],
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    info!(products = PRODUCTS.len(), "Products seeded");

    for (promotion, products) in promotions() {
        db.promotions().insert(&promotion).await?;
        for product_id in products {
            db.products()
                .attach_promotion(product_id, &promotion.id)
                .await?;
        }
    }
    info!("Promotions seeded");

    let reservation = db
        .reservation_service()
        .create(
            NewReservation {
                event_id: Some("demo-wedding".to_string()),
                notes: Some("Seeded demo reservation".to_string()),
                order: Order::new()
                    .with_line("croquetas", 3)
                    .with_line("tortilla", 12)
                    .with_line("queso", 2)
                    .with_line("vino", 6),
                consumption_type_id: "buffet".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .await?;

    info!(
        reservation_id = %reservation.id,
        total = %reservation.total_amount(),
        promo = reservation.has_promo_applied,
        "Demo reservation created"
    );

    let invoice = db
        .reservation_service()
        .invoice(&reservation.id, true, Utc::now())
        .await?;
    if let Some(vat) = &invoice.vat {
        info!(
            base = %vat.base_price,
            vat = %vat.vat_amount,
            net = %vat.net_price,
            pct = vat.vat_pct,
            "Demo invoice VAT split"
        );
    }

    db.close().await;
    Ok(())
}

/// Demo promotions with the products they are attached to.
fn promotions() -> Vec<(Promotion, Vec<&'static str>)> {
    let start = Utc::now() - Duration::days(1);
    let end = Utc::now() + Duration::days(90);
    let promo = |id: &str, name: &str, rule: PromotionRule, priority: i32, cumulative: bool| {
        Promotion {
            id: id.to_string(),
            name: name.to_string(),
            rule,
            priority,
            is_cumulative: cumulative,
            start_date: start,
            end_date: end,
            applicables: None,
        }
    };

    vec![
        (
            promo(
                "croquetas-3x2",
                "Croquetas 3x2",
                PromotionRule::BuyXPayY(BuyXPayY {
                    buy_quantity: 3,
                    pay_quantity: 2,
                }),
                10,
                false,
            ),
            vec!["croquetas"],
        ),
        (
            promo(
                "tortilla-dozen",
                "Twelfth tortilla free",
                PromotionRule::BuyXGetYFree(BuyXGetYFree {
                    buy_quantity: 11,
                    free_quantity: 1,
                }),
                5,
                false,
            ),
            vec!["tortilla"],
        ),
        (
            promo(
                "summer-10",
                "Summer 10 %",
                PromotionRule::PercentageOff(PercentageOff { percent_bps: 1000 }),
                1,
                true,
            ),
            vec!["salmorejo", "tortilla"],
        ),
        (
            promo(
                "wine-and-cheese",
                "Wine & cheese",
                PromotionRule::ComboDiscount(ComboDiscount {
                    required_product_ids: vec!["vino".to_string(), "queso".to_string()],
                    discount: DiscountKind::Percentage { percent_bps: 1500 },
                }),
                3,
                false,
            ),
            vec!["queso"],
        ),
        (
            promo(
                "cava-first-six",
                "Cava: 1 euro off the first six",
                PromotionRule::MaxUnitsDiscounted(MaxUnitsDiscounted {
                    max_units: 6,
                    discount: DiscountKind::FlatPerUnit {
                        amount_off_cents: 100,
                    },
                }),
                2,
                false,
            ),
            vec!["cava"],
        ),
        (
            promo(
                "wine-flat",
                "Wine 0.50 off",
                PromotionRule::FlatAmountOffPerUnit(FlatAmountOff {
                    amount_off_cents: 50,
                }),
                1,
                true,
            ),
            vec!["vino"],
        ),
    ]
}
