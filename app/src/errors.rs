// agro_market/src/errors.rs

use crate::gateway::GatewayError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use agro_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Not enough stock for {product}. Available: {available}")]
  InsufficientStock { product: String, available: i32 },

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("State Conflict: {0}")]
  StateConflict(String),

  #[error("PayPal Capture Status: {status}.")]
  ProviderDeclined { status: String },

  #[error("Payment Gateway Error: {message}")]
  Gateway {
    message: String,
    details: Option<serde_json::Value>,
  },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {0}")]
  Workflow(#[from] FlowError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl From<GatewayError> for AppError {
  fn from(err: GatewayError) -> Self {
    match err {
      GatewayError::Rejected { status, message, details } => AppError::Gateway {
        message: format!("PayPal API error ({}): {}", status, message),
        details,
      },
      GatewayError::Transport(msg) => AppError::Gateway {
        message: format!("Connection error with PayPal: {}", msg),
        details: None,
      },
      GatewayError::Malformed(msg) => AppError::Gateway {
        message: format!("Unexpected PayPal response: {}", msg),
        details: None,
      },
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InsufficientStock { .. } | AppError::ProviderDeclined { .. } => {
        StatusCode::BAD_REQUEST
      }
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::StateConflict(_) => StatusCode::CONFLICT,
      AppError::Gateway { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }

    let body = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::StateConflict(m) => json!({ "error": m }),
      AppError::InsufficientStock { product, available } => json!({
        "error": self.to_string(),
        "product": product,
        "available": available,
      }),
      AppError::ProviderDeclined { .. } => json!({ "error": self.to_string() }),
      AppError::Gateway { message, details } => match details {
        Some(details) => json!({ "error": message, "paypal_error_details": details }),
        None => json!({ "error": message }),
      },
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow(_) | AppError::Internal(_) => {
        json!({ "error": "An unexpected server error occurred." })
      }
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
    let resp = err.error_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[actix_rt::test]
  async fn insufficient_stock_names_product_and_availability() {
    let (status, body) = body_json(AppError::InsufficientStock {
      product: "Maize".to_string(),
      available: 3,
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Not enough stock for Maize. Available: 3");
    assert_eq!(body["available"], 3);
  }

  #[actix_rt::test]
  async fn declined_capture_echoes_provider_status() {
    let (status, body) = body_json(AppError::ProviderDeclined {
      status: "DECLINED".to_string(),
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PayPal Capture Status: DECLINED.");
  }

  #[actix_rt::test]
  async fn gateway_errors_carry_provider_details() {
    let (status, body) = body_json(AppError::from(GatewayError::Rejected {
      status: 422,
      message: "UNPROCESSABLE_ENTITY".to_string(),
      details: Some(json!([{ "issue": "INSTRUMENT_DECLINED" }])),
    }))
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["paypal_error_details"][0]["issue"], "INSTRUMENT_DECLINED");
  }

  #[actix_rt::test]
  async fn internal_errors_are_not_leaked() {
    let (status, body) = body_json(AppError::Internal("db password is hunter2".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.to_string().contains("hunter2"));
  }
}
