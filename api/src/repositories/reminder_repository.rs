use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use domain::Reminder;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct ReminderUpdate {
    pub reminder_text: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_completed: Option<bool>,
}

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reminder>>;
    async fn find_by_id(&self, reminder_id: Uuid) -> Result<Option<Reminder>>;
    async fn create(&self, reminder: &Reminder) -> Result<()>;
    async fn update(&self, reminder_id: Uuid, update: &ReminderUpdate)
        -> Result<Option<Reminder>>;
    async fn delete(&self, reminder_id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PostgresReminderRepository {
    pool: PgPool,
}

impl PostgresReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_reminder(row: &sqlx::postgres::PgRow) -> Result<Reminder> {
        Ok(Reminder {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            reminder_text: row.try_get("reminder_text")?,
            due_date: row.try_get("due_date")?,
            is_completed: row.try_get("is_completed")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const REMINDER_COLUMNS: &str =
    "id, user_id, reminder_text, due_date, is_completed, created_at, updated_at";

#[async_trait]
impl ReminderRepository for PostgresReminderRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reminder>> {
        let rows = sqlx::query(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = $1 ORDER BY due_date ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| Self::row_to_reminder(&row))
            .collect()
    }

    async fn find_by_id(&self, reminder_id: Uuid) -> Result<Option<Reminder>> {
        let row = sqlx::query(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1"
        ))
        .bind(reminder_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_reminder(&row)).transpose()
    }

    async fn create(&self, reminder: &Reminder) -> Result<()> {
        sqlx::query(
            "INSERT INTO reminders (id, user_id, reminder_text, due_date, is_completed)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(reminder.id)
        .bind(reminder.user_id)
        .bind(&reminder.reminder_text)
        .bind(reminder.due_date)
        .bind(reminder.is_completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        reminder_id: Uuid,
        update: &ReminderUpdate,
    ) -> Result<Option<Reminder>> {
        let row = sqlx::query(&format!(
            "UPDATE reminders SET
                reminder_text = COALESCE($2, reminder_text),
                due_date = COALESCE($3, due_date),
                is_completed = COALESCE($4, is_completed),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(reminder_id)
        .bind(&update.reminder_text)
        .bind(update.due_date)
        .bind(update.is_completed)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Self::row_to_reminder(&row)).transpose()
    }

    async fn delete(&self, reminder_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(reminder_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
