use std::time::Duration as StdDuration;

use auth::AuthError;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use domain::{LoginRequest, LoginResponse, User};
use notifier::NotificationRequest;
use serde::Deserialize;
use serde_json::json;
use time::Duration as CookieDuration;
use tracing::warn;

use crate::{
    auth_middleware::{CurrentUser, AUTH_TOKEN_COOKIE},
    config::AppConfig,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), StatusCode> {
    let login = state.auth.login(payload).await.map_err(map_auth_err)?;
    let jar = jar.add(auth_cookie(login.token.clone(), &state.config));
    Ok((jar, Json(login)))
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
) -> Result<(CookieJar, StatusCode), StatusCode> {
    state
        .auth
        .logout(user.claims().session_id)
        .await
        .map_err(map_auth_err)?;
    let jar = jar.add(expired_auth_cookie(&state.config));
    Ok((jar, StatusCode::NO_CONTENT))
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<User>, StatusCode> {
    let found = state
        .user_repo
        .find_by_id(user.claims().user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    found.map(Json).ok_or(StatusCode::UNAUTHORIZED)
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordPayload {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordPayload {
    token: String,
    new_password: String,
}

/// Always answers 200 so the endpoint cannot be used to probe which emails
/// have accounts. The reset link goes out through the notifier; a send
/// failure is logged and otherwise invisible to the caller.
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.auth.request_password_reset(&payload.email).await {
        Ok(token) => {
            let origin = state
                .config
                .frontend_origins
                .first()
                .map(String::as_str)
                .unwrap_or("http://localhost:3000");
            let request = NotificationRequest {
                subject: "Password Reset Request".to_string(),
                body: format!(
                    "A password reset was requested for your account.\n\
                     Open {origin}/reset-password?token={token} to choose a new password.\n\
                     The link expires in {} minutes.",
                    state.config.reset_token_ttl.as_secs() / 60
                ),
                recipients: vec![payload.email.clone()],
            };
            let result = state.notifier.send(&request).await;
            if result.is_failure() {
                warn!(reason = ?result.reason, "password reset email failed to send");
            }
        }
        Err(AuthError::UserNotFound) => {}
        Err(err) => return Err(map_auth_err(err)),
    }

    Ok(Json(json!({
        "message": "If that account exists, a reset email has been sent."
    })))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state
        .auth
        .reset_password(&payload.token, &payload.new_password)
        .await
        .map_err(map_auth_err)?;
    Ok(Json(json!({ "message": "Password has been reset successfully!" })))
}

fn map_auth_err(err: AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::UsernameTaken | AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidEmail
        | AuthError::PasswordTooShort
        | AuthError::ResetTokenInvalid => StatusCode::BAD_REQUEST,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((AUTH_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(config.cookie_same_site)
        .path("/")
        .max_age(duration_to_cookie(config.access_token_ttl))
        .build()
}

fn expired_auth_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((AUTH_TOKEN_COOKIE, ""))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(config.cookie_same_site)
        .path("/")
        .max_age(CookieDuration::seconds(0))
        .build()
}

fn duration_to_cookie(duration: StdDuration) -> CookieDuration {
    let seconds = duration.as_secs().min(i64::MAX as u64) as i64;
    CookieDuration::seconds(seconds)
}
