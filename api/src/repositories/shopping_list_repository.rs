use anyhow::Result;
use async_trait::async_trait;
use domain::ShoppingListItem;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct ShoppingListUpdate {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub purchased: Option<bool>,
    pub notes: Option<String>,
}

#[async_trait]
pub trait ShoppingListRepository: Send + Sync {
    async fn list(&self, user_id: Option<Uuid>) -> Result<Vec<ShoppingListItem>>;
    async fn find_by_id(&self, item_id: Uuid) -> Result<Option<ShoppingListItem>>;
    async fn create(&self, item: &ShoppingListItem) -> Result<()>;
    async fn update(&self, item_id: Uuid, update: &ShoppingListUpdate)
        -> Result<Option<ShoppingListItem>>;
    async fn delete(&self, item_id: Uuid) -> Result<bool>;
    async fn set_purchased(&self, item_id: Uuid, purchased: bool)
        -> Result<Option<ShoppingListItem>>;
}

#[derive(Clone)]
pub struct PostgresShoppingListRepository {
    pool: PgPool,
}

impl PostgresShoppingListRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &sqlx::postgres::PgRow) -> Result<ShoppingListItem> {
        Ok(ShoppingListItem {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit: row.try_get("unit")?,
            category: row.try_get("category")?,
            priority: row.try_get("priority")?,
            purchased: row.try_get("purchased")?,
            notes: row.try_get("notes")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const ITEM_COLUMNS: &str =
    "id, name, quantity, unit, category, priority, purchased, notes, user_id, created_at, updated_at";

#[async_trait]
impl ShoppingListRepository for PostgresShoppingListRepository {
    async fn list(&self, user_id: Option<Uuid>) -> Result<Vec<ShoppingListItem>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {ITEM_COLUMNS} FROM shopping_list_items
                     WHERE user_id = $1 ORDER BY created_at ASC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ITEM_COLUMNS} FROM shopping_list_items ORDER BY created_at ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(|row| Self::row_to_item(&row)).collect()
    }

    async fn find_by_id(&self, item_id: Uuid) -> Result<Option<ShoppingListItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM shopping_list_items WHERE id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_item(&row)).transpose()
    }

    async fn create(&self, item: &ShoppingListItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO shopping_list_items
             (id, name, quantity, unit, category, priority, purchased, notes, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(&item.category)
        .bind(&item.priority)
        .bind(item.purchased)
        .bind(&item.notes)
        .bind(item.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        item_id: Uuid,
        update: &ShoppingListUpdate,
    ) -> Result<Option<ShoppingListItem>> {
        let row = sqlx::query(&format!(
            "UPDATE shopping_list_items SET
                name = COALESCE($2, name),
                quantity = COALESCE($3, quantity),
                unit = COALESCE($4, unit),
                category = COALESCE($5, category),
                priority = COALESCE($6, priority),
                purchased = COALESCE($7, purchased),
                notes = COALESCE($8, notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item_id)
        .bind(&update.name)
        .bind(update.quantity)
        .bind(&update.unit)
        .bind(&update.category)
        .bind(&update.priority)
        .bind(update.purchased)
        .bind(&update.notes)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_item(&row)).transpose()
    }

    async fn delete(&self, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shopping_list_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_purchased(
        &self,
        item_id: Uuid,
        purchased: bool,
    ) -> Result<Option<ShoppingListItem>> {
        let row = sqlx::query(&format!(
            "UPDATE shopping_list_items SET purchased = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(item_id)
        .bind(purchased)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_item(&row)).transpose()
    }
}
