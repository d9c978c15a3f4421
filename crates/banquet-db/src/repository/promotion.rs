//! # Promotion Repository
//!
//! Promotions are stored split in two columns, `rule` (the tag) and
//! `conditions` (the JSON payload), and rebuilt into a
//! [`PromotionRule`] on read.

use banquet_core::validation::validate_promotion;
use banquet_core::{Promotion, PromotionRule};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

const SELECT_PROMOTION: &str = r#"
    SELECT id, name, rule, conditions, priority, is_cumulative,
           start_date, end_date, applicables
    FROM promotions
"#;

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    name: String,
    rule: String,
    conditions: String,
    priority: i32,
    is_cumulative: bool,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    applicables: Option<String>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = DbError;

    fn try_from(row: PromotionRow) -> DbResult<Self> {
        let conditions: serde_json::Value = serde_json::from_str(&row.conditions)?;
        let rule = PromotionRule::from_parts(&row.rule, conditions)?;
        let applicables = row
            .applicables
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()?;

        Ok(Promotion {
            id: row.id,
            name: row.name,
            rule,
            priority: row.priority,
            is_cumulative: row.is_cumulative,
            start_date: row.start_date,
            end_date: row.end_date,
            applicables,
        })
    }
}

/// Repository for promotions.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let row: Option<PromotionRow> =
            sqlx::query_as(&format!("{SELECT_PROMOTION} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Promotion::try_from).transpose()
    }

    /// Promotions whose window contains `now`, highest priority first.
    pub async fn list_valid_at(&self, now: DateTime<Utc>) -> DbResult<Vec<Promotion>> {
        let rows: Vec<PromotionRow> = sqlx::query_as(&format!(
            "{SELECT_PROMOTION} WHERE start_date <= ?1 AND end_date > ?1 ORDER BY priority DESC, id"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Promotion::try_from).collect()
    }

    /// Validates and inserts a promotion.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<Promotion> {
        validate_promotion(promotion)?;

        let (kind, conditions) = promotion.rule.to_parts()?;
        debug!(id = %promotion.id, rule = kind.as_str(), "Inserting promotion");

        let applicables = promotion
            .applicables
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO promotions (
                id, name, rule, conditions, priority, is_cumulative,
                start_date, end_date, applicables, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(kind.as_str())
        .bind(serde_json::to_string(&conditions)?)
        .bind(promotion.priority)
        .bind(promotion.is_cumulative)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(applicables)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(promotion.clone())
    }

    /// Hard delete. Products still listing the id make pricing fail with
    /// a missing-promotion error until they are detached.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use banquet_core::promotion::{BuyXGetYFree, ComboDiscount, DiscountKind};
    use banquet_core::{CoreError, ValidationError};
    use chrono::Duration;

    fn combo() -> Promotion {
        let now = Utc::now();
        Promotion {
            id: "combo".to_string(),
            name: "Wine with cheese".to_string(),
            rule: PromotionRule::ComboDiscount(ComboDiscount {
                required_product_ids: vec!["wine".to_string(), "cheese".to_string()],
                discount: DiscountKind::Percentage { percent_bps: 1500 },
            }),
            priority: 2,
            is_cumulative: false,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            applicables: Some(vec!["cheese".to_string()]),
        }
    }

    #[tokio::test]
    async fn test_rule_survives_storage() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();

        repo.insert(&combo()).await.unwrap();
        let loaded = repo.get_by_id("combo").await.unwrap().unwrap();

        assert_eq!(loaded.rule, combo().rule);
        assert_eq!(loaded.applicables, Some(vec!["cheese".to_string()]));
        assert_eq!(loaded.priority, 2);
    }

    #[tokio::test]
    async fn test_list_valid_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();

        let mut expired = combo();
        expired.id = "expired".to_string();
        expired.end_date = Utc::now() - Duration::hours(1);
        expired.start_date = Utc::now() - Duration::days(3);

        repo.insert(&combo()).await.unwrap();
        repo.insert(&expired).await.unwrap();

        let valid = repo.list_valid_at(Utc::now()).await.unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, "combo");

        repo.delete("combo").await.unwrap();
        assert!(matches!(
            repo.delete("combo").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_out_of_range_conditions() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promotions();

        let mut bogus = combo();
        bogus.id = "bogus".to_string();
        bogus.rule = PromotionRule::BuyXGetYFree(BuyXGetYFree {
            buy_quantity: i64::MAX,
            free_quantity: 1,
        });

        assert!(matches!(
            repo.insert(&bogus).await,
            Err(DbError::Core(CoreError::Validation(
                ValidationError::OutOfRange { .. }
            )))
        ));
        assert!(repo.get_by_id("bogus").await.unwrap().is_none());
    }
}
