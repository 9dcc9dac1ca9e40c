use std::{sync::Arc, time::Duration};

use anyhow::Result;
use auth::{AuthConfig, PasswordAuthService};
use chrono::Duration as ChronoDuration;
use notifier::{LoggingNotifier, NotificationSender, SmtpConfig, SmtpNotificationSender};
use sqlx::PgPool;

use crate::{
    config::AppConfig,
    repositories::{
        PostgresAlertRepository, PostgresReminderRepository, PostgresShoppingListRepository,
        PostgresStockRepository, PostgresUserRepository,
    },
    services::{AlertEvaluator, AlertThresholds},
    state::AppState,
};

pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let pool = PgPool::connect(&config.database_url).await?;
    sqlx::migrate!("../migrations").run(&pool).await?;

    let auth_service = PasswordAuthService::new(
        AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            jwt_audience: config.jwt_audience.clone(),
            jwt_issuer: config.jwt_issuer.clone(),
            access_token_ttl: chrono_duration(config.access_token_ttl),
            reset_token_ttl: chrono_duration(config.reset_token_ttl),
        },
        pool.clone(),
    );

    let stock_repo = Arc::new(PostgresStockRepository::new(pool.clone()));
    let alert_repo = Arc::new(PostgresAlertRepository::new(pool.clone()));
    let shopping_repo = Arc::new(PostgresShoppingListRepository::new(pool.clone()));
    let reminder_repo = Arc::new(PostgresReminderRepository::new(pool.clone()));
    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));

    let notifier = build_notifier(config)?;

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
    if config.enable_alert_worker {
        evaluator.clone().spawn(config.alert_interval);
    }

    Ok(AppState {
        config: config.clone(),
        db: pool,
        auth: Arc::new(auth_service),
        notifier,
        evaluator,
        stock_repo,
        alert_repo,
        shopping_repo,
        reminder_repo,
        user_repo,
    })
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn NotificationSender>> {
    match &config.smtp {
        Some(smtp) => {
            let sender = SmtpNotificationSender::new(SmtpConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                from_address: smtp.from_address.clone(),
                send_timeout: config.notification_timeout,
            })?;
            tracing::info!(host = %smtp.host, "using SMTP notifier");
            Ok(Arc::new(sender))
        }
        None => {
            tracing::info!("SMTP not configured; notifications will only be logged");
            Ok(Arc::new(LoggingNotifier))
        }
    }
}

fn chrono_duration(value: Duration) -> ChronoDuration {
    ChronoDuration::from_std(value).unwrap_or_else(|_| ChronoDuration::seconds(1))
}
