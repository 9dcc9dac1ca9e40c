use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use domain::Reminder;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth_middleware::CurrentUser,
    repositories::ReminderUpdate,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reminders", get(list_reminders).post(create_reminder))
        .route(
            "/reminders/:reminder_id",
            get(get_reminder).put(update_reminder).delete(delete_reminder),
        )
}

#[derive(Debug, Deserialize)]
struct CreateReminderPayload {
    reminder_text: String,
    due_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct UpdateReminderPayload {
    reminder_text: Option<String>,
    due_date: Option<NaiveDate>,
    is_completed: Option<bool>,
}

async fn list_reminders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Reminder>>, StatusCode> {
    state
        .reminder_repo
        .list_for_user(user.claims().user_id)
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn get_reminder(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reminder_id): Path<Uuid>,
) -> Result<Json<Reminder>, StatusCode> {
    let reminder = find_owned(&state, &user, reminder_id).await?;
    Ok(Json(reminder))
}

async fn create_reminder(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateReminderPayload>,
) -> Result<(StatusCode, Json<Reminder>), StatusCode> {
    if payload.reminder_text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let now = Utc::now();
    let reminder = Reminder {
        id: Uuid::new_v4(),
        user_id: user.claims().user_id,
        reminder_text: payload.reminder_text.trim().to_string(),
        due_date: payload.due_date,
        is_completed: false,
        created_at: now,
        updated_at: now,
    };
    state
        .reminder_repo
        .create(&reminder)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

async fn update_reminder(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reminder_id): Path<Uuid>,
    Json(payload): Json<UpdateReminderPayload>,
) -> Result<Json<Reminder>, StatusCode> {
    find_owned(&state, &user, reminder_id).await?;

    let update = ReminderUpdate {
        reminder_text: payload.reminder_text,
        due_date: payload.due_date,
        is_completed: payload.is_completed,
    };
    let updated = state
        .reminder_repo
        .update(reminder_id, &update)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    updated.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_reminder(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reminder_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    find_owned(&state, &user, reminder_id).await?;
    let deleted = state
        .reminder_repo
        .delete(reminder_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn find_owned(
    state: &AppState,
    user: &CurrentUser,
    reminder_id: Uuid,
) -> Result<Reminder, StatusCode> {
    let reminder = state
        .reminder_repo
        .find_by_id(reminder_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    if reminder.user_id != user.claims().user_id {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(reminder)
}
