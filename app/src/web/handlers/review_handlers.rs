// agro_market/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Review;
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct ReviewListQuery {
  pub product: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
pub struct ReviewPayload {
  #[serde(alias = "product")]
  pub product_id: Uuid,
  pub rating: i16,
  #[serde(default)]
  pub comment: String,
}

#[instrument(name = "handler::list_reviews", skip_all, fields(product = ?query.product))]
pub async fn list_reviews_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ReviewListQuery>,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let reviews = tx.list_reviews(query.product).await?;
  Ok(HttpResponse::Ok().json(reviews))
}

#[instrument(name = "handler::create_review", skip_all, fields(user_id = %auth.id()))]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<ReviewPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if !(1..=5).contains(&payload.rating) {
    return Err(AppError::Validation("Rating must be between 1 and 5.".to_string()));
  }

  let mut tx = app_state.store.begin().await?;
  if tx.product_by_id(payload.product_id).await?.is_none() {
    return Err(AppError::Validation(format!("Product {} does not exist.", payload.product_id)));
  }
  let review = Review {
    id: Uuid::new_v4(),
    product_id: payload.product_id,
    user_id: auth.id(),
    rating: payload.rating,
    comment: payload.comment,
    created_at: Utc::now(),
  };
  tx.insert_review(&review).await?;
  tx.commit().await?;

  info!(review_id = %review.id, "Review created.");
  Ok(HttpResponse::Created().json(review))
}

#[instrument(name = "handler::delete_review", skip_all, fields(review_id = %path.as_ref()))]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let review_id = path.into_inner();
  let mut tx = app_state.store.begin().await?;

  let review = tx
    .review_by_id(review_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Review {} not found.", review_id)))?;
  if review.user_id != auth.id() && !auth.is_staff() {
    return Err(AppError::Forbidden("Only the author can delete this review.".to_string()));
  }
  tx.delete_review(review_id).await?;
  tx.commit().await?;

  info!("Review deleted.");
  Ok(HttpResponse::NoContent().finish())
}
