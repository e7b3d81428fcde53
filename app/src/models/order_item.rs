// agro_market/src/models/order_item.rs

use super::Product;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  /// Unit price copied from the product when the item was created.
  pub price: Decimal,
}

impl OrderItem {
  pub fn line_total(&self) -> Decimal {
    self.price * Decimal::from(self.quantity)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetail {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product: Option<Product>,
  pub quantity: i32,
  pub price: Decimal,
}
