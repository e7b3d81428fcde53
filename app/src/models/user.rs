// agro_market/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_farmer: bool,
  pub is_buyer: bool,
  pub is_staff: bool,
  pub date_joined: DateTime<Utc>,
}
