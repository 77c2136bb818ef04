use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use super::UpsertOutcome;

/// An outbound shipment record, the local target of outbound syncs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Shipment {
    pub id: Uuid,
    /// Natural key from the source system; rows without one are plain inserts.
    pub outbound_id: Option<String>,
    pub product_model: String,
    pub product_name: String,
    pub quantity: i64,
    pub customer_name: String,
    pub outbound_date: NaiveDate,
    pub unit_price: Option<f64>,
    pub warehouse: Option<String>,
    pub customer_code: Option<String>,
    pub product_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field set written by a sync run.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentData {
    pub outbound_id: Option<String>,
    pub product_model: String,
    pub product_name: String,
    pub quantity: i64,
    pub customer_name: String,
    pub outbound_date: NaiveDate,
    pub unit_price: Option<f64>,
    pub warehouse: Option<String>,
    pub customer_code: Option<String>,
    pub product_type: Option<String>,
}

impl Shipment {
    /// Insert-or-update keyed by `outbound_id`. Repeated syncs over
    /// overlapping date windows stay idempotent because a matching
    /// `outbound_id` updates in place.
    pub async fn upsert(pool: &SqlitePool, data: &ShipmentData) -> Result<UpsertOutcome, sqlx::Error> {
        if let Some(outbound_id) = data.outbound_id.as_deref() {
            let existing: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM shipments WHERE outbound_id = $1")
                    .bind(outbound_id)
                    .fetch_optional(pool)
                    .await?;

            if let Some((id,)) = existing {
                sqlx::query(
                    "UPDATE shipments
                     SET product_model = $1, product_name = $2, quantity = $3,
                         customer_name = $4, outbound_date = $5, unit_price = $6,
                         warehouse = $7, customer_code = $8, product_type = $9,
                         updated_at = $10
                     WHERE id = $11",
                )
                .bind(&data.product_model)
                .bind(&data.product_name)
                .bind(data.quantity)
                .bind(&data.customer_name)
                .bind(data.outbound_date)
                .bind(data.unit_price)
                .bind(&data.warehouse)
                .bind(&data.customer_code)
                .bind(&data.product_type)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;
                return Ok(UpsertOutcome::Updated);
            }
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO shipments (id, outbound_id, product_model, product_name, quantity,
                                    customer_name, outbound_date, unit_price, warehouse,
                                    customer_code, product_type, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(Uuid::new_v4())
        .bind(&data.outbound_id)
        .bind(&data.product_model)
        .bind(&data.product_name)
        .bind(data.quantity)
        .bind(&data.customer_name)
        .bind(data.outbound_date)
        .bind(data.unit_price)
        .bind(&data.warehouse)
        .bind(&data.customer_code)
        .bind(&data.product_type)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(UpsertOutcome::Created)
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM shipments ORDER BY outbound_date DESC, created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shipments")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    fn data(outbound_id: Option<&str>, quantity: i64) -> ShipmentData {
        ShipmentData {
            outbound_id: outbound_id.map(str::to_string),
            product_model: "SKU1".to_string(),
            product_name: "Widget".to_string(),
            quantity,
            customer_name: "Acme".to_string(),
            outbound_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            unit_price: Some(9.5),
            warehouse: None,
            customer_code: None,
            product_type: None,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_outbound_id() {
        let (pool, _tmp) = create_test_pool().await;

        let first = Shipment::upsert(&pool, &data(Some("IN-001"), 10)).await.unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let second = Shipment::upsert(&pool, &data(Some("IN-001"), 25)).await.unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        assert_eq!(Shipment::count(&pool).await.unwrap(), 1);
        let rows = Shipment::find_recent(&pool, 10).await.unwrap();
        assert_eq!(rows[0].quantity, 25);
    }

    #[tokio::test]
    async fn rows_without_natural_key_always_insert() {
        let (pool, _tmp) = create_test_pool().await;

        Shipment::upsert(&pool, &data(None, 1)).await.unwrap();
        Shipment::upsert(&pool, &data(None, 2)).await.unwrap();

        assert_eq!(Shipment::count(&pool).await.unwrap(), 2);
    }
}
