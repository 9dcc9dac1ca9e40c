pub mod alerts;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod reminders;
pub mod shopping_list;
pub mod stock;
pub mod users;
