use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::UpsertOutcome;

/// An inbound receipt record, the local target of inbound syncs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Receipt {
    pub id: Uuid,
    /// Natural key from the source system; rows without one are plain inserts.
    pub entry_id: Option<String>,
    pub product_model: String,
    pub product_name: String,
    pub quantity: i64,
    pub arrival_date: NaiveDate,
    pub supplier: String,
    pub unit_price: Option<f64>,
    pub warehouse: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field set written by a sync run.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptData {
    pub entry_id: Option<String>,
    pub product_model: String,
    pub product_name: String,
    pub quantity: i64,
    pub arrival_date: NaiveDate,
    pub supplier: String,
    pub unit_price: Option<f64>,
    pub warehouse: Option<String>,
}

impl Receipt {
    /// Insert-or-update keyed by `entry_id`.
    pub async fn upsert(pool: &SqlitePool, data: &ReceiptData) -> Result<UpsertOutcome, sqlx::Error> {
        if let Some(entry_id) = data.entry_id.as_deref() {
            let existing: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM receipts WHERE entry_id = $1")
                    .bind(entry_id)
                    .fetch_optional(pool)
                    .await?;

            if let Some((id,)) = existing {
                sqlx::query(
                    "UPDATE receipts
                     SET product_model = $1, product_name = $2, quantity = $3,
                         arrival_date = $4, supplier = $5, unit_price = $6,
                         warehouse = $7, updated_at = $8
                     WHERE id = $9",
                )
                .bind(&data.product_model)
                .bind(&data.product_name)
                .bind(data.quantity)
                .bind(data.arrival_date)
                .bind(&data.supplier)
                .bind(data.unit_price)
                .bind(&data.warehouse)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;
                return Ok(UpsertOutcome::Updated);
            }
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO receipts (id, entry_id, product_model, product_name, quantity,
                                   arrival_date, supplier, unit_price, warehouse,
                                   created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(Uuid::new_v4())
        .bind(&data.entry_id)
        .bind(&data.product_model)
        .bind(&data.product_name)
        .bind(data.quantity)
        .bind(data.arrival_date)
        .bind(&data.supplier)
        .bind(data.unit_price)
        .bind(&data.warehouse)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(UpsertOutcome::Created)
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM receipts ORDER BY arrival_date DESC, created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM receipts")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    fn data(entry_id: &str, quantity: i64) -> ReceiptData {
        ReceiptData {
            entry_id: Some(entry_id.to_string()),
            product_model: "SKU9".to_string(),
            product_name: "Gadget".to_string(),
            quantity,
            arrival_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            supplier: "Globex".to_string(),
            unit_price: None,
            warehouse: Some("WH-A".to_string()),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_entry_id() {
        let (pool, _tmp) = create_test_pool().await;

        assert_eq!(
            Receipt::upsert(&pool, &data("E-77", 5)).await.unwrap(),
            UpsertOutcome::Created
        );
        assert_eq!(
            Receipt::upsert(&pool, &data("E-77", 8)).await.unwrap(),
            UpsertOutcome::Updated
        );

        assert_eq!(Receipt::count(&pool).await.unwrap(), 1);
        let rows = Receipt::find_recent(&pool, 10).await.unwrap();
        assert_eq!(rows[0].quantity, 8);
    }
}
