// agro_market/src/web/handlers/delivery_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::DeliveryStatus;
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct DeliveryUpdatePayload {
  pub status: Option<DeliveryStatus>,
  pub delivery_agent: Option<String>,
}

#[instrument(name = "handler::get_delivery", skip_all, fields(order_id = %path.as_ref()))]
pub async fn get_delivery_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let not_found = || AppError::NotFound(format!("Delivery for order {} not found.", order_id));
  let mut tx = app_state.store.begin().await?;

  let order = tx.order_by_id(order_id).await?.ok_or_else(not_found)?;
  if !auth.is_staff() && order.buyer_id != auth.id() {
    return Err(not_found());
  }
  let delivery = tx.delivery_by_order(order_id).await?.ok_or_else(not_found)?;
  Ok(HttpResponse::Ok().json(delivery))
}

#[instrument(name = "handler::update_delivery", skip_all, fields(order_id = %path.as_ref()))]
pub async fn update_delivery_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<DeliveryUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  auth.require_staff()?;
  let order_id = path.into_inner();
  let payload = req_payload.into_inner();

  let mut tx = app_state.store.begin().await?;
  let mut delivery = tx
    .delivery_by_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Delivery for order {} not found.", order_id)))?;

  if let Some(status) = payload.status {
    if status < delivery.status {
      return Err(AppError::StateConflict(format!(
        "Delivery cannot move back from {:?} to {:?}.",
        delivery.status, status
      )));
    }
    delivery.status = status;
  }
  if let Some(agent) = payload.delivery_agent {
    let agent = agent.trim().to_string();
    delivery.delivery_agent = if agent.is_empty() { None } else { Some(agent) };
  }

  tx.update_delivery(&delivery).await?;
  tx.commit().await?;

  info!(status = ?delivery.status, "Delivery updated.");
  Ok(HttpResponse::Ok().json(delivery))
}
