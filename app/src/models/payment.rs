// agro_market/src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

pub const DEFAULT_PAYMENT_METHOD: &str = "N/A";
pub const PAYPAL_METHOD: &str = "PayPal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status")]
pub enum PaymentStatus {
  Pending,
  #[sqlx(rename = "Pending PayPal")]
  #[serde(rename = "Pending PayPal")]
  PendingPayPal,
  Completed,
  Failed,
  Refunded,
}

impl PaymentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      PaymentStatus::Pending => "Pending",
      PaymentStatus::PendingPayPal => "Pending PayPal",
      PaymentStatus::Completed => "Completed",
      PaymentStatus::Failed => "Failed",
      PaymentStatus::Refunded => "Refunded",
    }
  }

  pub fn can_transition_to(self, next: PaymentStatus) -> bool {
    use PaymentStatus::*;
    matches!(
      (self, next),
      (Pending, PendingPayPal)
        | (Pending, Failed)
        | (Failed, PendingPayPal)
        | (Failed, Failed)
        | (PendingPayPal, Completed)
        | (PendingPayPal, Failed)
        | (Completed, Refunded)
    )
  }

  /// A provider session may be opened for a fresh or previously failed payment.
  pub fn is_openable(self) -> bool {
    matches!(self, PaymentStatus::Pending | PaymentStatus::Failed)
  }
}

impl std::fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub amount: Decimal,
  pub status: PaymentStatus,
  pub transaction_id: Option<String>,
  pub payment_method: String,
  pub paypal_order_id: Option<String>,
  pub paypal_payment_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Payment {
  /// Moves to `next` if the state machine allows it; returns whether it moved.
  pub fn transition(&mut self, next: PaymentStatus) -> bool {
    if self.status.can_transition_to(next) {
      self.status = next;
      true
    } else {
      false
    }
  }
}
