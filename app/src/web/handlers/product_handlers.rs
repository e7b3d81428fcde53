// agro_market/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Category, Product};
use crate::state::AppState;
use crate::store::StoreTx;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
pub struct ProductPayload {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Decimal>,
  pub quantity: Option<i32>,
  pub category_id: Option<Uuid>,
  pub image_url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CategoryPayload {
  pub name: String,
}

fn validate_fields(name: Option<&str>, price: Option<Decimal>, quantity: Option<i32>) -> Result<(), AppError> {
  if name.is_some_and(|n| n.trim().is_empty()) {
    return Err(AppError::Validation("Product name may not be blank.".to_string()));
  }
  if price.is_some_and(|p| p.is_sign_negative()) {
    return Err(AppError::Validation("Price must not be negative.".to_string()));
  }
  if quantity.is_some_and(|q| q < 0) {
    return Err(AppError::Validation("Quantity must not be negative.".to_string()));
  }
  Ok(())
}

async fn ensure_category(tx: &mut dyn StoreTx, category_id: Option<Uuid>) -> Result<(), AppError> {
  if let Some(id) = category_id {
    if tx.category_by_id(id).await?.is_none() {
      return Err(AppError::Validation(format!("Category {} does not exist.", id)));
    }
  }
  Ok(())
}

/// The caller's own product; other farmers' products are reported as missing.
async fn owned_product(tx: &mut dyn StoreTx, product_id: Uuid, farmer_id: Uuid) -> Result<Product, AppError> {
  match tx.product_by_id(product_id).await? {
    Some(product) if product.farmer_id == farmer_id => Ok(product),
    _ => Err(AppError::NotFound(format!("Product with ID {} not found.", product_id))),
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let products = tx.list_products().await?;
  info!(count = products.len(), "Products fetched.");
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let mut tx = app_state.store.begin().await?;

  match tx.product_by_id(product_id).await? {
    Some(product) => Ok(HttpResponse::Ok().json(product)),
    None => {
      warn!("Product not found.");
      Err(AppError::NotFound(format!("Product with ID {} not found.", product_id)))
    }
  }
}

#[instrument(name = "handler::create_product", skip_all, fields(farmer_id = %auth.id()))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<ProductPayload>,
) -> Result<HttpResponse, AppError> {
  auth.require_farmer()?;
  let payload = req_payload.into_inner();

  let name = payload
    .name
    .ok_or_else(|| AppError::Validation("Product name is required.".to_string()))?;
  let price = payload
    .price
    .ok_or_else(|| AppError::Validation("Price is required.".to_string()))?;
  let quantity = payload.quantity.unwrap_or(0);
  validate_fields(Some(&name), Some(price), Some(quantity))?;

  let mut tx = app_state.store.begin().await?;
  ensure_category(&mut *tx, payload.category_id).await?;

  let product = Product {
    id: Uuid::new_v4(),
    name: name.trim().to_string(),
    description: payload.description.unwrap_or_default(),
    price,
    quantity,
    farmer_id: auth.id(),
    category_id: payload.category_id,
    image_url: payload.image_url,
    created_at: Utc::now(),
  };
  tx.insert_product(&product).await?;
  tx.commit().await?;

  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}

async fn update_product(
  app_state: &AppState,
  auth: &AuthenticatedUser,
  product_id: Uuid,
  payload: ProductPayload,
  partial: bool,
) -> Result<HttpResponse, AppError> {
  auth.require_farmer()?;
  if !partial && (payload.name.is_none() || payload.price.is_none() || payload.quantity.is_none()) {
    return Err(AppError::Validation(
      "Name, price and quantity are required for a full update.".to_string(),
    ));
  }
  validate_fields(payload.name.as_deref(), payload.price, payload.quantity)?;

  let mut tx = app_state.store.begin().await?;
  let mut product = owned_product(&mut *tx, product_id, auth.id()).await?;
  ensure_category(&mut *tx, payload.category_id).await?;

  if let Some(name) = payload.name {
    product.name = name.trim().to_string();
  }
  if let Some(price) = payload.price {
    product.price = price;
  }
  if let Some(quantity) = payload.quantity {
    product.quantity = quantity;
  }
  if partial {
    if let Some(description) = payload.description {
      product.description = description;
    }
    if payload.category_id.is_some() {
      product.category_id = payload.category_id;
    }
    if payload.image_url.is_some() {
      product.image_url = payload.image_url;
    }
  } else {
    product.description = payload.description.unwrap_or_default();
    product.category_id = payload.category_id;
    product.image_url = payload.image_url;
  }

  tx.update_product(&product).await?;
  tx.commit().await?;

  info!(product_id = %product.id, "Product updated.");
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::replace_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn replace_product_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductPayload>,
) -> Result<HttpResponse, AppError> {
  update_product(&app_state, &auth, path.into_inner(), req_payload.into_inner(), false).await
}

#[instrument(name = "handler::patch_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn patch_product_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductPayload>,
) -> Result<HttpResponse, AppError> {
  update_product(&app_state, &auth, path.into_inner(), req_payload.into_inner(), true).await
}

#[instrument(name = "handler::delete_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth.require_farmer()?;
  let product_id = path.into_inner();

  let mut tx = app_state.store.begin().await?;
  owned_product(&mut *tx, product_id, auth.id()).await?;
  tx.delete_product(product_id).await?;
  tx.commit().await?;

  info!("Product deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let categories = tx.list_categories().await?;
  Ok(HttpResponse::Ok().json(categories))
}

#[instrument(name = "handler::create_category", skip_all, fields(name = %req_payload.name))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  auth.require_farmer()?;
  let name = req_payload.name.trim();
  if name.is_empty() {
    return Err(AppError::Validation("Category name may not be blank.".to_string()));
  }

  let mut tx = app_state.store.begin().await?;
  if tx.category_by_name(name).await?.is_some() {
    return Err(AppError::Validation(format!("Category '{}' already exists.", name)));
  }
  let category = Category {
    id: Uuid::new_v4(),
    name: name.to_string(),
  };
  tx.insert_category(&category).await?;
  tx.commit().await?;

  info!(category_id = %category.id, "Category created.");
  Ok(HttpResponse::Created().json(category))
}
