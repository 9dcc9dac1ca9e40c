use std::env;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    let admin_email =
        env::var("DEV_SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let admin_password =
        env::var("DEV_SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string());

    seed_demo(&pool, &admin_email, &admin_password).await?;
    println!("Seeded demo admin {} and pantry stock (dev only).", admin_email);
    Ok(())
}

async fn seed_demo(pool: &PgPool, admin_email: &str, admin_password: &str) -> Result<()> {
    let admin_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"homestock-dev-admin");
    let password_hash = auth::hash_password(admin_password)
        .map_err(|err| anyhow::anyhow!("failed to hash seed password: {err}"))?;

    let mut tx = pool.begin().await?;

    // Clean previous dev seed data so reruns stay stable.
    sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM stock_items WHERE name LIKE 'Demo %'")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role)
         VALUES ($1, 'admin', $2, $3, 'admin')",
    )
    .bind(admin_id)
    .bind(admin_email)
    .bind(&password_hash)
    .execute(&mut *tx)
    .await?;

    let today = Utc::now().date_naive();
    let demo_items = [
        ("Demo Milk", 2, today + Duration::days(3)),
        ("Demo Eggs", 12, today + Duration::days(14)),
        ("Demo Yogurt", 6, today - Duration::days(1)),
        ("Demo Rice", 1, today + Duration::days(180)),
    ];
    for (name, quantity, expiration_date) in demo_items {
        sqlx::query(
            "INSERT INTO stock_items (id, name, quantity, expiration_date)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(quantity)
        .bind(expiration_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
