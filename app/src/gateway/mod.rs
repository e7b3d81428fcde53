// agro_market/src/gateway/mod.rs

//! External payment provider seam.

pub mod paypal;

use async_trait::async_trait;
use thiserror::Error;

pub use paypal::PayPalClient;

/// What the create flow sends to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
  /// Amount with exactly two decimal places, e.g. `"25.00"`.
  pub amount: String,
  pub currency: String,
  pub description: String,
  pub custom_id: String,
  pub invoice_id: String,
}

/// Result of a capture call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
  /// Provider status, upper-cased (`COMPLETED`, `DECLINED`, ...).
  pub status: String,
  /// `purchase_units[0].payments.captures[0].id` when present.
  pub capture_id: Option<String>,
}

impl CaptureOutcome {
  pub fn is_completed(&self) -> bool {
    self.status == "COMPLETED"
  }
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
  #[error("transport failure: {0}")]
  Transport(String),

  #[error("provider rejected the request with status {status}: {message}")]
  Rejected {
    status: u16,
    message: String,
    details: Option<serde_json::Value>,
  },

  #[error("malformed provider response: {0}")]
  Malformed(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Opens a provider checkout session and returns its id.
  async fn create_order(&self, request: &CheckoutRequest) -> Result<String, GatewayError>;

  /// Captures a previously approved session.
  async fn capture_order(&self, session_id: &str) -> Result<CaptureOutcome, GatewayError>;
}
