// agro_market/src/models/delivery.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "delivery_status")]
pub enum DeliveryStatus {
  Pending,
  Dispatched,
  #[sqlx(rename = "In Transit")]
  #[serde(rename = "In Transit")]
  InTransit,
  Delivered,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Delivery {
  pub id: Uuid,
  pub order_id: Uuid,
  pub delivery_address: String,
  pub status: DeliveryStatus,
  pub delivery_agent: Option<String>,
}
