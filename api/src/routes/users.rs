use auth::AuthError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use domain::{RegisterRequest, Role, User};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth_middleware::CurrentUser,
    repositories::UserUpdate,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register_user))
        .route(
            "/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let user = state.auth.register(payload).await.map_err(map_auth_err)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully!", "user": user })),
    ))
}

async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<User>>, StatusCode> {
    user.ensure_role(Role::Admin)?;
    state
        .user_repo
        .list_all()
        .await
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, StatusCode> {
    ensure_admin_or_self(&user, user_id)?;
    let found = state
        .user_repo
        .find_by_id(user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    found.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
struct UpdateUserPayload {
    username: Option<String>,
    email: Option<String>,
    role: Option<String>,
}

async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, StatusCode> {
    ensure_admin_or_self(&user, user_id)?;
    // Role changes stay admin-only even on your own account.
    if payload.role.is_some() {
        user.ensure_role(Role::Admin)?;
    }

    let update = UserUpdate {
        username: payload.username,
        email: payload.email,
        role: payload.role.as_deref().map(Role::from_str),
    };
    let updated = state
        .user_repo
        .update(user_id, &update)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    updated.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    ensure_admin_or_self(&user, user_id)?;
    let deleted = state
        .user_repo
        .delete(user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn ensure_admin_or_self(user: &CurrentUser, target: Uuid) -> Result<(), StatusCode> {
    if user.claims().user_id == target {
        return Ok(());
    }
    user.ensure_role(Role::Admin)
}

fn map_auth_err(err: AuthError) -> StatusCode {
    match err {
        AuthError::UsernameTaken | AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidEmail | AuthError::PasswordTooShort => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound | AuthError::ResetTokenInvalid => StatusCode::BAD_REQUEST,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
