// agro_market/src/gateway/paypal.rs

//! PayPal REST v2 checkout-orders client.

use super::{CaptureOutcome, CheckoutRequest, GatewayError, PaymentGateway};
use crate::config::PayPalConfig;
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{event, instrument, Level};

pub struct PayPalClient {
  http: Client,
  base_url: String,
  client_id: String,
  client_secret: String,
}

impl PayPalClient {
  pub fn new(config: &PayPalConfig) -> AppResult<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build PayPal HTTP client: {}", e)))?;
    Ok(Self {
      http,
      base_url: config.base_url().trim_end_matches('/').to_string(),
      client_id: config.client_id.clone(),
      client_secret: config.client_secret.clone(),
    })
  }

  fn orders_url(&self) -> String {
    format!("{}/v2/checkout/orders", self.base_url)
  }

  async fn read_json(response: Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body: Option<Value> = response.json().await.ok();
    if status.is_success() {
      return body.ok_or_else(|| GatewayError::Malformed("response body is not JSON".to_string()));
    }
    Err(rejection(status.as_u16(), body))
  }
}

/// Builds a `Rejected` error, joining `details[].description` (or `issue`) when PayPal sent them.
fn rejection(status: u16, body: Option<Value>) -> GatewayError {
  let details = body.as_ref().and_then(|b| b.get("details")).cloned();
  let described: Vec<String> = details
    .as_ref()
    .and_then(Value::as_array)
    .map(|items| {
      items
        .iter()
        .filter_map(|d| d.get("description").or_else(|| d.get("issue")).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default();

  let message = if !described.is_empty() {
    described.join(", ")
  } else {
    body
      .as_ref()
      .and_then(|b| b.get("message").or_else(|| b.get("name")))
      .and_then(Value::as_str)
      .unwrap_or("request failed")
      .to_string()
  };

  GatewayError::Rejected { status, message, details }
}

fn capture_id(body: &Value) -> Option<String> {
  body
    .pointer("/purchase_units/0/payments/captures/0/id")
    .and_then(Value::as_str)
    .map(str::to_string)
}

#[async_trait]
impl PaymentGateway for PayPalClient {
  #[instrument(name = "paypal::create_order", skip(self, request), fields(invoice_id = %request.invoice_id), err(Display))]
  async fn create_order(&self, request: &CheckoutRequest) -> Result<String, GatewayError> {
    let payload = json!({
      "intent": "CAPTURE",
      "purchase_units": [{
        "amount": { "currency_code": request.currency, "value": request.amount },
        "description": request.description,
        "custom_id": request.custom_id,
        "invoice_id": request.invoice_id,
      }]
    });

    let response = self
      .http
      .post(self.orders_url())
      .basic_auth(&self.client_id, Some(&self.client_secret))
      .header("PayPal-Request-Id", &request.invoice_id)
      .json(&payload)
      .send()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let body = Self::read_json(response).await?;
    let session_id = body
      .get("id")
      .and_then(Value::as_str)
      .ok_or_else(|| GatewayError::Malformed("create-order response missing 'id'".to_string()))?;
    event!(Level::INFO, paypal_order_id = %session_id, "PayPal order created.");
    Ok(session_id.to_string())
  }

  #[instrument(name = "paypal::capture_order", skip(self), err(Display))]
  async fn capture_order(&self, session_id: &str) -> Result<CaptureOutcome, GatewayError> {
    let response = self
      .http
      .post(format!("{}/{}/capture", self.orders_url(), session_id))
      .basic_auth(&self.client_id, Some(&self.client_secret))
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .send()
      .await
      .map_err(|e| GatewayError::Transport(e.to_string()))?;

    let body = Self::read_json(response).await?;
    let status = body
      .get("status")
      .and_then(Value::as_str)
      .unwrap_or("UNKNOWN")
      .to_ascii_uppercase();
    let outcome = CaptureOutcome {
      capture_id: capture_id(&body),
      status,
    };
    event!(Level::INFO, paypal_status = %outcome.status, capture_id = ?outcome.capture_id, "PayPal capture answered.");
    Ok(outcome)
  }
}
