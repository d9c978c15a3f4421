//! # Consumption Type Repository
//!
//! Consumption types ("buffet", "seated", "takeaway") only matter to
//! pricing through their id, which keys product supplements.

use banquet_core::ConsumptionType;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ConsumptionTypeRepository {
    pool: SqlitePool,
}

impl ConsumptionTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConsumptionTypeRepository { pool }
    }

    pub async fn insert(&self, consumption_type: &ConsumptionType) -> DbResult<()> {
        debug!(id = %consumption_type.id, "Inserting consumption type");

        sqlx::query("INSERT INTO consumption_types (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&consumption_type.id)
            .bind(&consumption_type.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ConsumptionType>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, name FROM consumption_types WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name)| ConsumptionType { id, name }))
    }

    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consumption_types WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn list(&self) -> DbResult<Vec<ConsumptionType>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM consumption_types ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| ConsumptionType { id, name })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use banquet_core::ConsumptionType;

    #[tokio::test]
    async fn test_insert_exists_and_duplicate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.consumption_types();
        let buffet = ConsumptionType {
            id: "buffet".to_string(),
            name: "Buffet".to_string(),
        };

        repo.insert(&buffet).await.unwrap();
        assert!(repo.exists("buffet").await.unwrap());
        assert!(!repo.exists("seated").await.unwrap());
        assert_eq!(repo.get_by_id("buffet").await.unwrap(), Some(buffet.clone()));
        assert_eq!(repo.list().await.unwrap().len(), 1);

        assert!(matches!(
            repo.insert(&buffet).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }
}
