use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{auth_middleware::CurrentUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/expiring-items", get(expiring_items))
}

#[derive(Serialize)]
struct DashboardStats {
    total_items: i64,
    expiring_soon: i64,
    expired_items: i64,
}

#[derive(Serialize)]
struct ExpiringItem {
    id: Uuid,
    name: String,
    quantity: i32,
    expiration_date: String,
    days_until_expiry: i64,
}

/// Counts over the whole pantry. "Expiring soon" is today through the
/// configured window inclusive; already-expired items are counted
/// separately, not as expiring.
async fn stats(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<DashboardStats>, StatusCode> {
    let items = state
        .stock_repo
        .list_all()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let today = Utc::now().date_naive();
    let cutoff = today + ChronoDuration::days(state.config.expiration_window_days);

    let mut expiring_soon = 0;
    let mut expired_items = 0;
    for item in &items {
        if item.expiration_date < today {
            expired_items += 1;
        } else if item.expiration_date <= cutoff {
            expiring_soon += 1;
        }
    }

    Ok(Json(DashboardStats {
        total_items: items.len() as i64,
        expiring_soon,
        expired_items,
    }))
}

async fn expiring_items(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<ExpiringItem>>, StatusCode> {
    let today = Utc::now().date_naive();
    let cutoff = today + ChronoDuration::days(state.config.expiration_window_days);
    let items = state
        .stock_repo
        .list_expiring_by(cutoff)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(
        items
            .into_iter()
            .filter(|item| item.expiration_date >= today)
            .map(|item| ExpiringItem {
                id: item.id,
                name: item.name,
                quantity: item.quantity,
                expiration_date: item.expiration_date.format("%Y-%m-%d").to_string(),
                days_until_expiry: (item.expiration_date - today).num_days(),
            })
            .collect(),
    ))
}
