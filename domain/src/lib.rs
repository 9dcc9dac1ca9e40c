use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn from_str(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// A pantry stock row. Read-only to the alert core; mutated via the stock
/// CRUD routes. `quantity` is never negative (DB CHECK enforced).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
}

/// An advisory alert record. The message is the only link back to the stock
/// item that produced it; alerts are append-only and never deduplicated.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Alert {
    pub id: Uuid,
    pub message: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An alert yet to be persisted. Drafts from one rule evaluation are
/// committed as a single batch.
#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: String,
    pub priority: String,
    pub purchased: bool,
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reminder_text: String,
    pub due_date: NaiveDate,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}
