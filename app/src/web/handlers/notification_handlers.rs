// agro_market/src/web/handlers/notification_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Notification;
use crate::state::AppState;
use crate::store::StoreTx;
use crate::web::AuthenticatedUser;

async fn own_notification(tx: &mut dyn StoreTx, id: Uuid, user_id: Uuid) -> Result<Notification, AppError> {
  match tx.notification_by_id(id).await? {
    Some(n) if n.user_id == user_id => Ok(n),
    _ => Err(AppError::NotFound(format!("Notification {} not found.", id))),
  }
}

#[instrument(name = "handler::list_notifications", skip_all, fields(user_id = %auth.id()))]
pub async fn list_notifications_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let notifications = tx.list_notifications(auth.id()).await?;
  Ok(HttpResponse::Ok().json(notifications))
}

#[instrument(name = "handler::mark_notification_read", skip_all, fields(notification_id = %path.as_ref()))]
pub async fn mark_notification_read_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  let mut tx = app_state.store.begin().await?;

  let mut notification = own_notification(&mut *tx, id, auth.id()).await?;
  tx.mark_notification_read(id).await?;
  tx.commit().await?;

  notification.is_read = true;
  Ok(HttpResponse::Ok().json(notification))
}

#[instrument(name = "handler::delete_notification", skip_all, fields(notification_id = %path.as_ref()))]
pub async fn delete_notification_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  let mut tx = app_state.store.begin().await?;

  own_notification(&mut *tx, id, auth.id()).await?;
  tx.delete_notification(id).await?;
  tx.commit().await?;
  Ok(HttpResponse::NoContent().finish())
}
