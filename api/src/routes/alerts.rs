use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{auth_middleware::CurrentUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts))
        .route("/alerts/check", post(check_alerts))
}

#[derive(Serialize)]
struct AlertResponse {
    alert_id: Uuid,
    message: String,
    created_at: String,
}

async fn list_alerts(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<AlertResponse>>, StatusCode> {
    let alerts = state
        .alert_repo
        .list_active()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(
        alerts
            .into_iter()
            .map(|alert| AlertResponse {
                alert_id: alert.id,
                message: alert.message,
                created_at: alert.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .collect(),
    ))
}

/// On-demand evaluation pass. Send failures are not surfaced here; only a
/// failed read or failed batch commit produces an error response.
async fn check_alerts(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.evaluator.run_once().await {
        Ok(_report) => (
            StatusCode::OK,
            Json(json!({ "message": "Alerts checked successfully!" })),
        ),
        Err(err) => {
            error!(error = %err, "on-demand alert check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}
