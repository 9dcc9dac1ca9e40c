use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Alert, AlertDraft};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Persist all drafts as one transaction. Either every alert row is
    /// committed or none are; there is no partial batch.
    async fn create_batch(&self, drafts: &[AlertDraft]) -> Result<Vec<Alert>>;
    async fn list_active(&self) -> Result<Vec<Alert>>;
}

#[derive(Clone)]
pub struct PostgresAlertRepository {
    pool: PgPool,
}

impl PostgresAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    async fn create_batch(&self, drafts: &[AlertDraft]) -> Result<Vec<Alert>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let alert_id = Uuid::new_v4();
            let row = sqlx::query(
                "INSERT INTO alerts (id, message, is_active) VALUES ($1, $2, TRUE)
                 RETURNING created_at",
            )
            .bind(alert_id)
            .bind(&draft.message)
            .fetch_one(&mut *tx)
            .await?;

            let created_at: DateTime<Utc> = row.try_get("created_at")?;
            created.push(Alert {
                id: alert_id,
                message: draft.message.clone(),
                is_active: true,
                created_at,
            });
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn list_active(&self) -> Result<Vec<Alert>> {
        let rows = sqlx::query(
            "SELECT id, message, is_active, created_at FROM alerts
             WHERE is_active = TRUE
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Alert {
                    id: row.try_get("id")?,
                    message: row.try_get("message")?,
                    is_active: row.try_get("is_active")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
