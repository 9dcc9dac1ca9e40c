pub mod alert_repository;
pub mod reminder_repository;
pub mod shopping_list_repository;
pub mod stock_repository;
pub mod user_repository;

pub use alert_repository::{AlertRepository, PostgresAlertRepository};
pub use reminder_repository::{PostgresReminderRepository, ReminderRepository, ReminderUpdate};
pub use shopping_list_repository::{
    PostgresShoppingListRepository, ShoppingListRepository, ShoppingListUpdate,
};
pub use stock_repository::{PostgresStockRepository, StockRepository};
pub use user_repository::{PostgresUserRepository, UserRepository, UserUpdate};
