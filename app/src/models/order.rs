// agro_market/src/models/order.rs

use super::{Delivery, OrderItemDetail, Payment};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  fn rank(self) -> u8 {
    match self {
      OrderStatus::Pending => 0,
      OrderStatus::Processing => 1,
      OrderStatus::Shipped => 2,
      OrderStatus::Delivered => 3,
      OrderStatus::Cancelled => 4,
    }
  }

  /// Orders only move forward. Cancellation is possible until the order ships.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    match next {
      OrderStatus::Cancelled => matches!(self, OrderStatus::Pending | OrderStatus::Processing),
      _ if self == OrderStatus::Cancelled => false,
      _ => next.rank() > self.rank(),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub total_price: Decimal,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// An order together with its items, delivery and payment, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItemDetail>,
  pub delivery: Option<Delivery>,
  pub payment: Option<Payment>,
}

#[cfg(test)]
mod tests {
  use super::OrderStatus::*;

  #[test]
  fn status_transitions_are_monotonic() {
    assert!(Pending.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Delivered));
    assert!(!Shipped.can_transition_to(Processing));
    assert!(!Pending.can_transition_to(Pending));
    assert!(Processing.can_transition_to(Cancelled));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Processing));
  }
}
