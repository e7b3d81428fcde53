// agro_market/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use agro_flow::{FlowContext, FlowOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::{PayPalCaptureCtxData, PayPalCreateCtxData};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CreatePayPalOrderPayload {
  pub order_id: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
pub struct CapturePayPalOrderPayload {
  #[serde(rename = "orderID")]
  pub paypal_order_id: Option<String>,
  #[serde(rename = "djangoOrderID", alias = "order_id")]
  pub order_id: Option<Uuid>,
}

#[instrument(name = "handler::paypal_create_order", skip_all, fields(buyer_id = %auth.id()))]
pub async fn create_paypal_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<CreatePayPalOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let order_id = req_payload
    .order_id
    .ok_or_else(|| AppError::Validation("Order ID is required.".to_string()))?;

  let ctx = FlowContext::new(PayPalCreateCtxData::new(app_state.get_ref().clone(), auth.id(), order_id));

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let session_id = ctx.write().session_id.take().ok_or_else(|| {
        warn!("PayPal create flow completed without a session id.");
        AppError::Internal("PayPal order creation completed without an order id.".to_string())
      })?;
      info!(order_id = %order_id, paypal_order_id = %session_id, "PayPal order created.");
      Ok(HttpResponse::Created().json(json!({ "id": session_id })))
    }
    Ok(FlowOutcome::Stopped) => {
      warn!("PayPal create flow was stopped by a step.");
      Err(AppError::Internal("PayPal order creation was halted by an internal step.".to_string()))
    }
    Err(app_err) => {
      warn!(order_id = %order_id, error = %app_err, "PayPal create flow failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::paypal_capture_order", skip_all, fields(buyer_id = %auth.id()))]
pub async fn capture_paypal_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<CapturePayPalOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let (paypal_order_id, order_id) = match (payload.paypal_order_id, payload.order_id) {
    (Some(paypal_order_id), Some(order_id)) if !paypal_order_id.trim().is_empty() => (paypal_order_id, order_id),
    _ => {
      return Err(AppError::Validation(
        "Both orderID and djangoOrderID are required.".to_string(),
      ))
    }
  };

  let ctx = FlowContext::new(PayPalCaptureCtxData::new(
    app_state.get_ref().clone(),
    auth.id(),
    paypal_order_id,
    order_id,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let payment = ctx.write().payment.take().ok_or_else(|| {
        warn!("Capture flow completed without a payment in context.");
        AppError::Internal("Capture completed without a payment record.".to_string())
      })?;
      info!(payment_id = %payment.id, transaction_id = ?payment.transaction_id, "Payment captured.");
      Ok(HttpResponse::Ok().json(payment))
    }
    Ok(FlowOutcome::Stopped) => {
      if ctx.read().already_completed {
        info!(order_id = %order_id, "Capture requested for an already completed payment.");
        Ok(HttpResponse::Ok().json(json!({ "message": "Payment already completed." })))
      } else {
        warn!("Capture flow was stopped by a step.");
        Err(AppError::Internal("Payment capture was halted by an internal step.".to_string()))
      }
    }
    Err(app_err) => {
      warn!(order_id = %order_id, error = %app_err, "Capture flow failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::list_payments", skip_all)]
pub async fn list_payments_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth.require_staff()?;
  let mut tx = app_state.store.begin().await?;
  let payments = tx.list_payments().await?;
  Ok(HttpResponse::Ok().json(payments))
}

#[instrument(name = "handler::get_payment", skip_all, fields(payment_id = %path.as_ref()))]
pub async fn get_payment_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth.require_staff()?;
  let payment_id = path.into_inner();
  let mut tx = app_state.store.begin().await?;

  let payment = tx
    .payment_by_id(payment_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payment {} not found.", payment_id)))?;
  Ok(HttpResponse::Ok().json(payment))
}
