use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::UpsertOutcome;

/// Live stock quantity for one product model in one warehouse. Inventory
/// syncs overwrite the quantity outright (snapshot semantics), they never sum.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryLevel {
    pub id: Uuid,
    pub warehouse: String,
    pub product_model: String,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryLevel {
    /// Snapshot write keyed by `(warehouse, product_model)`.
    pub async fn upsert_snapshot(
        pool: &SqlitePool,
        warehouse: &str,
        product_model: &str,
        quantity: i64,
    ) -> Result<UpsertOutcome, sqlx::Error> {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM inventory_levels WHERE warehouse = $1 AND product_model = $2",
        )
        .bind(warehouse)
        .bind(product_model)
        .fetch_optional(pool)
        .await?;

        match existing {
            Some((id,)) => {
                sqlx::query("UPDATE inventory_levels SET quantity = $1, updated_at = $2 WHERE id = $3")
                    .bind(quantity)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(pool)
                    .await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                sqlx::query(
                    "INSERT INTO inventory_levels (id, warehouse, product_model, quantity, updated_at)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(Uuid::new_v4())
                .bind(warehouse)
                .bind(product_model)
                .bind(quantity)
                .bind(Utc::now())
                .execute(pool)
                .await?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    pub async fn find_all(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM inventory_levels ORDER BY warehouse, product_model LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inventory_levels")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
