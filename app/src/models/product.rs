// agro_market/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price: Decimal,
  /// Units in stock. Never negative; decremented only through a conditional update.
  pub quantity: i32,
  pub farmer_id: Uuid,
  pub category_id: Option<Uuid>,
  pub image_url: Option<String>,
  pub created_at: DateTime<Utc>,
}
