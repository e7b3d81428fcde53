// agro_market/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use agro_flow::{FlowContext, FlowOutcome};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::{AddOrderItemCtxData, CreateOrderCtxData, OrderLineInput};
use crate::models::Order;
use crate::services::order_view;
use crate::state::AppState;
use crate::store::StoreTx;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CreateOrderPayload {
  #[serde(alias = "items")]
  pub order_items: Vec<OrderLineInput>,
  pub delivery_address: String,
}

#[derive(Deserialize, Debug)]
pub struct AddOrderItemPayload {
  #[serde(alias = "order")]
  pub order_id: Uuid,
  #[serde(flatten)]
  pub line: OrderLineInput,
}

/// Staff see every order; buyers only their own. Anything else is a 404.
async fn visible_order(tx: &mut dyn StoreTx, order_id: Uuid, auth: &AuthenticatedUser) -> Result<Order, AppError> {
  match tx.order_by_id(order_id).await? {
    Some(order) if auth.is_staff() || order.buyer_id == auth.id() => Ok(order),
    _ => Err(AppError::NotFound(format!("Order {} not found.", order_id))),
  }
}

#[instrument(
    name = "handler::create_order",
    skip_all,
    fields(buyer_id = %auth.id(), lines = req_payload.order_items.len())
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = FlowContext::new(CreateOrderCtxData::new(
    app_state.get_ref().clone(),
    auth.id(),
    payload.order_items,
    payload.delivery_address,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let order = ctx.write().order.take().ok_or_else(|| {
        warn!("Order flow completed but no order was recorded in context.");
        AppError::Internal("Order creation completed without an order.".to_string())
      })?;
      info!(order_id = %order.id, total = %order.total_price, "Order created.");

      let mut tx = app_state.store.begin().await?;
      let detail = order_view::order_detail(&mut *tx, order).await?;
      Ok(HttpResponse::Created().json(detail))
    }
    Ok(FlowOutcome::Stopped) => {
      warn!("Order flow was stopped by a step.");
      Err(AppError::Internal("Order creation was halted by an internal step.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Order flow failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = %auth.id()))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let orders = tx.list_orders(auth.scope()).await?;

  let mut details = Vec::with_capacity(orders.len());
  for order in orders {
    details.push(order_view::order_detail(&mut *tx, order).await?);
  }
  Ok(HttpResponse::Ok().json(details))
}

#[instrument(name = "handler::get_order", skip_all, fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let order = visible_order(&mut *tx, path.into_inner(), &auth).await?;
  let detail = order_view::order_detail(&mut *tx, order).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(name = "handler::list_order_items", skip_all, fields(user_id = %auth.id()))]
pub async fn list_order_items_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let items = tx.list_order_items(auth.scope()).await?;

  let mut details = Vec::with_capacity(items.len());
  for item in items {
    details.push(order_view::item_detail(&mut *tx, item).await?);
  }
  Ok(HttpResponse::Ok().json(details))
}

#[instrument(name = "handler::get_order_item", skip_all, fields(item_id = %path.as_ref()))]
pub async fn get_order_item_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let mut tx = app_state.store.begin().await?;

  let item = tx
    .order_item_by_id(item_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order item {} not found.", item_id)))?;
  visible_order(&mut *tx, item.order_id, &auth)
    .await
    .map_err(|_| AppError::NotFound(format!("Order item {} not found.", item_id)))?;

  let detail = order_view::item_detail(&mut *tx, item).await?;
  Ok(HttpResponse::Ok().json(detail))
}

#[instrument(
    name = "handler::add_order_item",
    skip_all,
    fields(buyer_id = %auth.id(), order_id = %req_payload.order_id)
)]
pub async fn add_order_item_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<AddOrderItemPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = FlowContext::new(AddOrderItemCtxData::new(
    app_state.get_ref().clone(),
    auth.id(),
    payload.order_id,
    payload.line,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let item = ctx.write().created_item.take().ok_or_else(|| {
        warn!("Order item flow completed but no item was recorded in context.");
        AppError::Internal("Adding the item completed without an item.".to_string())
      })?;
      info!(item_id = %item.id, "Order item added.");

      let mut tx = app_state.store.begin().await?;
      let detail = order_view::item_detail(&mut *tx, item).await?;
      Ok(HttpResponse::Created().json(detail))
    }
    Ok(FlowOutcome::Stopped) => {
      warn!("Order item flow was stopped by a step.");
      Err(AppError::Internal("Adding the item was halted by an internal step.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Order item flow failed.");
      Err(app_err)
    }
  }
}
