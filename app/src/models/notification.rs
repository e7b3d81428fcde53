// agro_market/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
  pub id: Uuid,
  pub user_id: Uuid,
  pub message: String,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
}

impl Notification {
  pub fn new(user_id: Uuid, message: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      user_id,
      message: message.into(),
      is_read: false,
      created_at: chrono::Utc::now(),
    }
  }
}
