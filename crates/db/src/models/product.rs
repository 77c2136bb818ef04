use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// Catalog entry keyed by product model.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub product_model: String,
    pub product_name: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub async fn find_by_model(
        pool: &SqlitePool,
        product_model: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM products WHERE product_model = $1")
            .bind(product_model)
            .fetch_optional(pool)
            .await
    }

    /// Create a minimal catalog entry if `product_model` is unknown. Returns
    /// true when a new entry was created. Used by inventory syncs, which are
    /// allowed to introduce models the catalog has never seen.
    pub async fn ensure_exists(
        pool: &SqlitePool,
        product_model: &str,
        product_name: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        if Self::find_by_model(pool, product_model).await?.is_some() {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO products (id, product_model, product_name, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT(product_model) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(product_model)
        .bind(product_name.unwrap_or(product_model))
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    #[tokio::test]
    async fn ensure_exists_creates_once() {
        let (pool, _tmp) = create_test_pool().await;

        assert!(Product::ensure_exists(&pool, "SKU1", None).await.unwrap());
        assert!(!Product::ensure_exists(&pool, "SKU1", Some("Widget")).await.unwrap());

        let product = Product::find_by_model(&pool, "SKU1").await.unwrap().unwrap();
        // Auto-created entries fall back to the model as the name.
        assert_eq!(product.product_name, "SKU1");
    }
}
