use std::{sync::Arc, time::Duration};

use api::{
    app::build_router,
    config::AppConfig,
    repositories::{
        PostgresAlertRepository, PostgresReminderRepository, PostgresShoppingListRepository,
        PostgresStockRepository, PostgresUserRepository,
    },
    services::{AlertEvaluator, AlertThresholds},
    state::AppState,
};
use async_trait::async_trait;
use auth::{AuthError, AuthResult, AuthService, JwtClaims};
use axum::{
    body::{to_bytes, Body},
    http::{HeaderValue, Request, StatusCode},
};
use axum_extra::extract::cookie::SameSite;
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use domain::{LoginRequest, LoginResponse, RegisterRequest, Role, User};
use notifier::LoggingNotifier;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Clone)]
struct StubAuthService {
    token: String,
    claims: JwtClaims,
}

#[async_trait]
impl AuthService for StubAuthService {
    async fn register(&self, _payload: RegisterRequest) -> AuthResult<User> {
        Err(AuthError::Internal("not used in tests".to_string()))
    }

    async fn login(&self, _payload: LoginRequest) -> AuthResult<LoginResponse> {
        Err(AuthError::InvalidCredentials)
    }

    async fn validate_token(&self, token: &str) -> AuthResult<JwtClaims> {
        if token == self.token {
            Ok(self.claims.clone())
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    async fn logout(&self, _session_id: Uuid) -> AuthResult<()> {
        Ok(())
    }

    async fn request_password_reset(&self, _email: &str) -> AuthResult<String> {
        Err(AuthError::UserNotFound)
    }

    async fn reset_password(&self, _token: &str, _new_password: &str) -> AuthResult<()> {
        Err(AuthError::ResetTokenInvalid)
    }
}

fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        database_url,
        jwt_secret: "dev-secret".to_string(),
        jwt_audience: "homestock".to_string(),
        jwt_issuer: "homestock-api".to_string(),
        frontend_origins: vec!["http://localhost:3000".to_string()],
        cookie_secure: false,
        cookie_same_site: SameSite::Lax,
        access_token_ttl: Duration::from_secs(900),
        reset_token_ttl: Duration::from_secs(3600),
        low_stock_threshold: 5,
        expiration_window_days: 7,
        alert_interval: Duration::from_secs(86_400),
        notification_recipients: Vec::new(),
        notification_timeout: Duration::from_secs(5),
        smtp: None,
        enable_alert_worker: false,
        port: 0,
    }
}

fn test_claims(config: &AppConfig, user_id: Uuid, role: Role) -> JwtClaims {
    let now = Utc::now();
    JwtClaims {
        sub: user_id.to_string(),
        role,
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
        exp: (now + ChronoDuration::minutes(15))
            .timestamp()
            .try_into()
            .unwrap(),
        iat: now.timestamp().try_into().unwrap(),
        session_id: Uuid::new_v4(),
        user_id,
    }
}

fn test_state(pool: PgPool, auth: Arc<dyn AuthService>) -> AppState {
    let config = test_config(std::env::var("DATABASE_URL").unwrap_or_default());
    let stock_repo = Arc::new(PostgresStockRepository::new(pool.clone()));
    let alert_repo = Arc::new(PostgresAlertRepository::new(pool.clone()));
    let notifier = Arc::new(LoggingNotifier);
    let evaluator = Arc::new(AlertEvaluator::new(
        stock_repo.clone(),
        alert_repo.clone(),
        notifier.clone(),
        AlertThresholds {
            low_stock: config.low_stock_threshold,
            expiration_window_days: config.expiration_window_days,
        },
        config.notification_recipients.clone(),
    ));
    AppState {
        config,
        db: pool.clone(),
        auth,
        notifier,
        evaluator,
        stock_repo,
        alert_repo,
        shopping_repo: Arc::new(PostgresShoppingListRepository::new(pool.clone())),
        reminder_repo: Arc::new(PostgresReminderRepository::new(pool.clone())),
        user_repo: Arc::new(PostgresUserRepository::new(pool)),
    }
}

fn test_router(pool: PgPool, user_id: Uuid, role: Role) -> axum::Router {
    let config = test_config(String::new());
    let auth = Arc::new(StubAuthService {
        token: "test-token".to_string(),
        claims: test_claims(&config, user_id, role),
    });
    build_router(
        test_state(pool, auth),
        vec![HeaderValue::from_static("http://localhost:3000")],
    )
}

async fn insert_stock_item(pool: &PgPool, name: &str, quantity: i32, expires_in_days: i64) {
    let expiration_date = Utc::now().date_naive() + ChronoDuration::days(expires_in_days);
    sqlx::query(
        "INSERT INTO stock_items (id, name, quantity, expiration_date) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(quantity)
    .bind(expiration_date)
    .execute(pool)
    .await
    .expect("insert stock item");
}

async fn alert_messages(pool: &PgPool) -> Vec<String> {
    sqlx::query_scalar("SELECT message FROM alerts ORDER BY created_at ASC, message ASC")
        .fetch_all(pool)
        .await
        .expect("select alert messages")
}

#[sqlx::test(migrations = "../migrations")]
async fn check_alerts_creates_low_stock_and_expiration_rows(pool: PgPool) {
    insert_stock_item(&pool, "Milk", 2, 30).await;
    insert_stock_item(&pool, "Eggs", 10, 30).await;
    insert_stock_item(&pool, "Bread", 8, 1).await;

    let router = test_router(pool.clone(), Uuid::new_v4(), Role::User);
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/alerts/check")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["message"], "Alerts checked successfully!");

    let messages = alert_messages(&pool).await;
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .any(|m| m == "Low stock alert: Milk has only 2 units left."));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Expiration alert: Bread expires on ")));
    assert!(!messages.iter().any(|m| m.contains("Eggs")));
}

#[sqlx::test(migrations = "../migrations")]
async fn repeated_checks_append_duplicate_alerts(pool: PgPool) {
    insert_stock_item(&pool, "Milk", 1, 30).await;

    let router = test_router(pool.clone(), Uuid::new_v4(), Role::User);
    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/alerts/check")
                    .header("Authorization", "Bearer test-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let messages = alert_messages(&pool).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], messages[1]);
}

#[sqlx::test(migrations = "../migrations")]
async fn list_alerts_returns_active_newest_first(pool: PgPool) {
    let now = Utc::now();
    for (message, offset_secs, is_active) in [
        ("older alert", 120_i64, true),
        ("newer alert", 10, true),
        ("dismissed alert", 60, false),
    ] {
        sqlx::query(
            "INSERT INTO alerts (id, message, is_active, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(message)
        .bind(is_active)
        .bind(now - ChronoDuration::seconds(offset_secs))
        .execute(&pool)
        .await
        .expect("insert alert");
    }

    let router = test_router(pool, Uuid::new_v4(), Role::User);
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/alerts")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let alerts: Vec<serde_json::Value> = serde_json::from_slice(&body).expect("json");

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["message"], "newer alert");
    assert_eq!(alerts[1]["message"], "older alert");
    for alert in &alerts {
        assert!(alert["alert_id"].is_string());
        let created_at = alert["created_at"].as_str().expect("created_at string");
        NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S")
            .expect("created_at uses second precision");
    }
}

#[sqlx::test(migrations = "../migrations")]
async fn check_alerts_requires_authentication(pool: PgPool) {
    let router = test_router(pool, Uuid::new_v4(), Role::User);
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/alerts/check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../migrations")]
async fn create_stock_item_returns_created_message(pool: PgPool) {
    let router = test_router(pool.clone(), Uuid::new_v4(), Role::User);
    let payload = serde_json::json!({
        "name": "Oat Milk",
        "quantity": 4,
        "expiration_date": "2026-12-31"
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/stock")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["message"], "Stock item added successfully!");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_items WHERE name = 'Oat Milk'")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../migrations")]
async fn create_stock_item_rejects_negative_quantity(pool: PgPool) {
    let router = test_router(pool, Uuid::new_v4(), Role::User);
    let payload = serde_json::json!({
        "name": "Broken",
        "quantity": -1,
        "expiration_date": "2026-12-31"
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/stock")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../migrations")]
async fn list_users_is_admin_only(pool: PgPool) {
    let router = test_router(pool.clone(), Uuid::new_v4(), Role::User);
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_router = test_router(pool, Uuid::new_v4(), Role::Admin);
    let response = admin_router
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../migrations")]
async fn dashboard_stats_split_expired_from_expiring(pool: PgPool) {
    insert_stock_item(&pool, "Yogurt", 6, -2).await;
    insert_stock_item(&pool, "Milk", 2, 3).await;
    insert_stock_item(&pool, "Cheese", 4, 7).await;
    insert_stock_item(&pool, "Rice", 10, 180).await;

    let router = test_router(pool.clone(), Uuid::new_v4(), Role::User);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/stats")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let stats: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(stats["total_items"], 4);
    assert_eq!(stats["expiring_soon"], 2);
    assert_eq!(stats["expired_items"], 1);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/expiring-items")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let items: Vec<serde_json::Value> = serde_json::from_slice(&body).expect("json");
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item["name"] != "Yogurt"));
    let milk = items
        .iter()
        .find(|item| item["name"] == "Milk")
        .expect("milk listed");
    assert_eq!(milk["days_until_expiry"], 3);
}

#[sqlx::test(migrations = "../migrations")]
async fn shopping_list_toggle_flips_purchased(pool: PgPool) {
    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role)
         VALUES ($1, 'shopper', 'shopper@example.com', 'x', 'user')",
    )
    .bind(user_id)
    .execute(&pool)
    .await
    .expect("insert user");

    let item_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO shopping_list_items (id, name, quantity, unit, category, priority, purchased, user_id)
         VALUES ($1, 'Coffee', 1, 'bag', 'pantry', 'high', FALSE, $2)",
    )
    .bind(item_id)
    .bind(user_id)
    .execute(&pool)
    .await
    .expect("insert item");

    let router = test_router(pool.clone(), user_id, Role::User);
    let response = router
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/shopping-list/{item_id}/toggle"))
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let purchased: bool =
        sqlx::query_scalar("SELECT purchased FROM shopping_list_items WHERE id = $1")
            .bind(item_id)
            .fetch_one(&pool)
            .await
            .expect("select purchased");
    assert!(purchased);
}
