//! # Product Repository
//!
//! Database operations for catalog products.
//!
//! ## Stored Shape
//! ```text
//! products
//! ├── nominal_price   TEXT     "12.50"          money string
//! ├── supplement      TEXT     {"buffet": 200}  JSON, signed cents
//! ├── promotions      TEXT     ["promo-1"]      JSON, attached ids
//! └── stock           INTEGER  delta-updated only
//! ```

use std::collections::BTreeMap;

use banquet_core::validation::validate_product;
use banquet_core::Product;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, stock, nominal_price, supplement, promotions,
           is_active, created_at, updated_at
    FROM products
"#;

/// Raw `products` row.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    stock: i64,
    nominal_price: String,
    supplement: String,
    promotions: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let supplement: BTreeMap<String, i64> = serde_json::from_str(&row.supplement)?;
        let promotions: Vec<String> = serde_json::from_str(&row.promotions)?;

        Ok(Product {
            id: row.id,
            name: row.name,
            stock: row.stock,
            nominal_price: row.nominal_price,
            supplement,
            promotions,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE is_active = 1 ORDER BY name"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::Core)` - invalid name, stock or price
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_product(product)?;
        debug!(id = %product.id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, stock, nominal_price, supplement, promotions,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.stock)
        .bind(&product.nominal_price)
        .bind(serde_json::to_string(&product.supplement)?)
        .bind(serde_json::to_string(&product.promotions)?)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates catalog fields. Stock is left alone; it only moves through
    /// [`ProductRepository::update_stock`].
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                nominal_price = ?3,
                supplement = ?4,
                promotions = ?5,
                is_active = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.nominal_price)
        .bind(serde_json::to_string(&product.supplement)?)
        .bind(serde_json::to_string(&product.promotions)?)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Attaches a promotion id to a product, once.
    pub async fn attach_promotion(&self, product_id: &str, promotion_id: &str) -> DbResult<()> {
        let mut product = self
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        if !product.promotions.iter().any(|p| p == promotion_id) {
            product.promotions.push(promotion_id.to_string());
            self.update(&product).await?;
        }

        Ok(())
    }

    /// Applies a stock delta (negative reserves, positive restores).
    pub async fn update_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_stock_on(&mut conn, id, delta).await
    }

    /// Soft-deletes a product by setting is_active = false.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

/// Stock delta on an explicit connection, so it can join a transaction.
///
/// The update is relative (`stock = stock + delta`); concurrent writers add
/// up instead of overwriting each other. No lower bound is enforced here.
pub(crate) async fn update_stock_on(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<()> {
    debug!(id = %id, delta = delta, "Updating stock");

    let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        let mut supplement = BTreeMap::new();
        supplement.insert("buffet".to_string(), 150);
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            stock,
            nominal_price: "4.20".to_string(),
            supplement,
            promotions: vec![],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trips_json_columns() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", 10)).await.unwrap();
        let loaded = repo.get_by_id("p1").await.unwrap().unwrap();

        assert_eq!(loaded.nominal_price, "4.20");
        assert_eq!(loaded.supplement_for("buffet"), 150);
        assert_eq!(loaded.supplement_for("takeaway"), 0);
        assert!(repo.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = product("p1", 10);
        bad.nominal_price = "free".to_string();

        assert!(matches!(
            db.products().insert(&bad).await,
            Err(DbError::Core(_))
        ));
    }

    #[tokio::test]
    async fn test_update_stock_is_relative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&product("p1", 10)).await.unwrap();

        repo.update_stock("p1", -3).await.unwrap();
        repo.update_stock("p1", 1).await.unwrap();

        assert_eq!(repo.get_by_id("p1").await.unwrap().unwrap().stock, 8);
        assert!(matches!(
            repo.update_stock("ghost", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_attach_promotion_once_and_soft_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&product("p1", 10)).await.unwrap();

        repo.attach_promotion("p1", "promo").await.unwrap();
        repo.attach_promotion("p1", "promo").await.unwrap();
        assert_eq!(
            repo.get_by_id("p1").await.unwrap().unwrap().promotions,
            vec!["promo"]
        );

        repo.soft_delete("p1").await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());
    }
}
