use anyhow::Result;
use async_trait::async_trait;
use domain::{Role, User};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<User>>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn update(&self, user_id: Uuid, update: &UserUpdate) -> Result<Option<User>>;
    async fn delete(&self, user_id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User> {
        let role_raw: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role: Role::from_str(&role_raw),
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn list_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, username, email, role FROM users ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| Self::row_to_user(&row)).collect()
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Self::row_to_user(&row)).transpose()
    }

    async fn update(&self, user_id: Uuid, update: &UserUpdate) -> Result<Option<User>> {
        let row = sqlx::query(
            "UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                role = COALESCE($4, role)
             WHERE id = $1
             RETURNING id, username, email, role",
        )
        .bind(user_id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(update.role.map(|role| role.as_str().to_string()))
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_user(&row)).transpose()
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
