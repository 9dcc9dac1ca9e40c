use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use domain::ShoppingListItem;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth_middleware::CurrentUser,
    repositories::ShoppingListUpdate,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shopping-list", get(list_items).post(create_item))
        .route("/shopping-list/:item_id", get(get_item).put(update_item).delete(delete_item))
        .route("/shopping-list/:item_id/toggle", patch(toggle_purchased))
}

#[derive(Debug, Deserialize)]
struct CreateItemPayload {
    name: String,
    quantity: Option<f64>,
    unit: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateItemPayload {
    name: Option<String>,
    quantity: Option<f64>,
    unit: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    purchased: Option<bool>,
    notes: Option<String>,
}

async fn list_items(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ShoppingListItem>>, StatusCode> {
    state
        .shopping_repo
        .list(Some(user.claims().user_id))
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn get_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ShoppingListItem>, StatusCode> {
    let item = find_owned(&state, &user, item_id).await?;
    Ok(Json(item))
}

async fn create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateItemPayload>,
) -> Result<(StatusCode, Json<ShoppingListItem>), StatusCode> {
    if payload.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let now = Utc::now();
    let item = ShoppingListItem {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        quantity: payload.quantity.unwrap_or(1.0),
        unit: payload.unit.unwrap_or_else(|| "pcs".to_string()),
        category: payload.category.unwrap_or_else(|| "general".to_string()),
        priority: payload.priority.unwrap_or_else(|| "medium".to_string()),
        purchased: false,
        notes: payload.notes,
        user_id: Some(user.claims().user_id),
        created_at: now,
        updated_at: now,
    };
    state
        .shopping_repo
        .create(&item)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<Json<ShoppingListItem>, StatusCode> {
    find_owned(&state, &user, item_id).await?;

    let update = ShoppingListUpdate {
        name: payload.name,
        quantity: payload.quantity,
        unit: payload.unit,
        category: payload.category,
        priority: payload.priority,
        purchased: payload.purchased,
        notes: payload.notes,
    };
    let updated = state
        .shopping_repo
        .update(item_id, &update)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    updated.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    find_owned(&state, &user, item_id).await?;
    let deleted = state
        .shopping_repo
        .delete(item_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn toggle_purchased(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ShoppingListItem>, StatusCode> {
    let item = find_owned(&state, &user, item_id).await?;
    let toggled = state
        .shopping_repo
        .set_purchased(item_id, !item.purchased)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    toggled.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn find_owned(
    state: &AppState,
    user: &CurrentUser,
    item_id: Uuid,
) -> Result<ShoppingListItem, StatusCode> {
    let item = state
        .shopping_repo
        .find_by_id(item_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    // Legacy rows without an owner stay visible to everyone.
    if let Some(owner) = item.user_id {
        if owner != user.claims().user_id {
            return Err(StatusCode::FORBIDDEN);
        }
    }
    Ok(item)
}
