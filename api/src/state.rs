use auth::AuthService;
use notifier::NotificationSender;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    config::AppConfig,
    repositories::{
        AlertRepository, ReminderRepository, ShoppingListRepository, StockRepository,
        UserRepository,
    },
    services::AlertEvaluator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
    pub auth: Arc<dyn AuthService>,
    pub notifier: Arc<dyn NotificationSender>,
    pub evaluator: Arc<AlertEvaluator>,
    pub stock_repo: Arc<dyn StockRepository>,
    pub alert_repo: Arc<dyn AlertRepository>,
    pub shopping_repo: Arc<dyn ShoppingListRepository>,
    pub reminder_repo: Arc<dyn ReminderRepository>,
    pub user_repo: Arc<dyn UserRepository>,
}

// Ensure critical dependencies uphold Send/Sync for Axum state usage.
#[allow(dead_code)]
fn _assert_state_types_are_send_sync()
where
    AppConfig: Send + Sync + 'static,
    PgPool: Send + Sync + 'static,
    dyn AuthService: Send + Sync,
    dyn NotificationSender: Send + Sync,
    AlertEvaluator: Send + Sync,
    dyn StockRepository: Send + Sync,
    dyn AlertRepository: Send + Sync,
    dyn ShoppingListRepository: Send + Sync,
    dyn ReminderRepository: Send + Sync,
    dyn UserRepository: Send + Sync,
{
}

#[allow(dead_code)]
fn _assert_state_bounds() {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
}
