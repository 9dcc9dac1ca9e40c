use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use domain::StockItem;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Read side of the inventory for the alert core, plus the CRUD surface the
/// stock routes use.
#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<StockItem>>;
    async fn find_by_id(&self, item_id: Uuid) -> Result<Option<StockItem>>;
    async fn create(&self, name: &str, quantity: i32, expiration_date: NaiveDate)
        -> Result<StockItem>;
    async fn update(&self, item: &StockItem) -> Result<bool>;
    async fn delete(&self, item_id: Uuid) -> Result<bool>;
    /// Items with `quantity < threshold`.
    async fn list_below_quantity(&self, threshold: i32) -> Result<Vec<StockItem>>;
    /// Items with `expiration_date <= date`, overdue items included.
    async fn list_expiring_by(&self, date: NaiveDate) -> Result<Vec<StockItem>>;
}

#[derive(Clone)]
pub struct PostgresStockRepository {
    pool: PgPool,
}

impl PostgresStockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &sqlx::postgres::PgRow) -> Result<StockItem> {
        Ok(StockItem {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            expiration_date: row.try_get("expiration_date")?,
        })
    }
}

#[async_trait]
impl StockRepository for PostgresStockRepository {
    async fn list_all(&self) -> Result<Vec<StockItem>> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, expiration_date FROM stock_items ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Self::row_to_item(&row)).collect()
    }

    async fn find_by_id(&self, item_id: Uuid) -> Result<Option<StockItem>> {
        let row =
            sqlx::query("SELECT id, name, quantity, expiration_date FROM stock_items WHERE id = $1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|row| Self::row_to_item(&row)).transpose()
    }

    async fn create(
        &self,
        name: &str,
        quantity: i32,
        expiration_date: NaiveDate,
    ) -> Result<StockItem> {
        let item_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO stock_items (id, name, quantity, expiration_date) VALUES ($1, $2, $3, $4)",
        )
        .bind(item_id)
        .bind(name)
        .bind(quantity)
        .bind(expiration_date)
        .execute(&self.pool)
        .await?;

        Ok(StockItem {
            id: item_id,
            name: name.to_string(),
            quantity,
            expiration_date,
        })
    }

    async fn update(&self, item: &StockItem) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE stock_items SET name = $2, quantity = $3, expiration_date = $4 WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.expiration_date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_below_quantity(&self, threshold: i32) -> Result<Vec<StockItem>> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, expiration_date FROM stock_items WHERE quantity < $1",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Self::row_to_item(&row)).collect()
    }

    async fn list_expiring_by(&self, date: NaiveDate) -> Result<Vec<StockItem>> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, expiration_date FROM stock_items WHERE expiration_date <= $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Self::row_to_item(&row)).collect()
    }
}
