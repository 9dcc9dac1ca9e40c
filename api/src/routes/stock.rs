use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use domain::StockItem;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{auth_middleware::CurrentUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stock", get(list_stock).post(create_stock))
        .route("/stock/:item_id", get(get_stock).put(update_stock).delete(delete_stock))
}

#[derive(Debug, Deserialize)]
struct CreateStockPayload {
    name: String,
    quantity: i32,
    expiration_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct UpdateStockPayload {
    name: Option<String>,
    quantity: Option<i32>,
    expiration_date: Option<NaiveDate>,
}

async fn list_stock(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<StockItem>>, StatusCode> {
    state
        .stock_repo
        .list_all()
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn get_stock(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<StockItem>, StatusCode> {
    let item = state
        .stock_repo
        .find_by_id(item_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    item.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn create_stock(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<CreateStockPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    if payload.name.trim().is_empty() || payload.quantity < 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let item = state
        .stock_repo
        .create(payload.name.trim(), payload.quantity, payload.expiration_date)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Stock item added successfully!", "id": item.id })),
    ))
}

async fn update_stock(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateStockPayload>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if matches!(payload.quantity, Some(quantity) if quantity < 0) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let existing = state
        .stock_repo
        .find_by_id(item_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let item = StockItem {
        id: existing.id,
        name: payload.name.unwrap_or(existing.name),
        quantity: payload.quantity.unwrap_or(existing.quantity),
        expiration_date: payload.expiration_date.unwrap_or(existing.expiration_date),
    };

    let updated = state
        .stock_repo
        .update(&item)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if updated {
        Ok(Json(json!({ "message": "Stock item updated successfully!" })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn delete_stock(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let deleted = state
        .stock_repo
        .delete(item_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if deleted {
        Ok(Json(json!({ "message": "Stock item deleted successfully!" })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
