// agro_market/src/web/handlers/profile_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::DEFAULT_PHONE_NUMBER;
use crate::models::{Profile, User};
use crate::state::AppState;
use crate::store::StoreTx;
use crate::web::AuthenticatedUser;

/// A role flag as sent by web and form clients: a JSON boolean, a number, or
/// one of the usual truthy strings.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RoleFlag {
  Bool(bool),
  Number(i64),
  Text(String),
}

impl RoleFlag {
  pub fn is_set(&self) -> bool {
    match self {
      RoleFlag::Bool(b) => *b,
      RoleFlag::Number(n) => *n == 1,
      RoleFlag::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t" | "y" | "yes"),
    }
  }
}

#[derive(Deserialize, Debug, Default)]
pub struct ProfileUpdatePayload {
  pub phone_number: Option<String>,
  pub address: Option<String>,
  pub profile_picture: Option<String>,
  pub is_farmer: Option<RoleFlag>,
  pub is_buyer: Option<RoleFlag>,
}

#[derive(Serialize, Debug)]
pub struct ProfileView {
  pub id: Uuid,
  pub user: User,
  pub phone_number: String,
  pub address: Option<String>,
  pub is_farmer: bool,
  pub is_buyer: bool,
  pub profile_picture_url: String,
}

impl ProfileView {
  fn new(profile: Profile, user: User, media_url: &str) -> Self {
    Self {
      id: profile.id,
      profile_picture_url: profile.picture_url(media_url),
      is_farmer: user.is_farmer,
      is_buyer: user.is_buyer,
      phone_number: profile.phone_number,
      address: profile.address,
      user,
    }
  }
}

/// Applies role changes; clearing `is_farmer` makes the user a buyer.
/// Returns whether the user row changed.
pub fn apply_role_flags(user: &mut User, is_farmer: Option<&RoleFlag>, is_buyer: Option<&RoleFlag>) -> bool {
  let mut changed = false;
  if let Some(flag) = is_farmer {
    let wanted = flag.is_set();
    if user.is_farmer != wanted {
      user.is_farmer = wanted;
      if !wanted {
        user.is_buyer = true;
      }
      changed = true;
    }
  }
  if let Some(flag) = is_buyer {
    let wanted = flag.is_set();
    if user.is_buyer != wanted {
      user.is_buyer = wanted;
      changed = true;
    }
  }
  changed
}

async fn profile_or_create(tx: &mut dyn StoreTx, user_id: Uuid) -> Result<Profile, AppError> {
  if let Some(profile) = tx.profile_by_user(user_id).await? {
    return Ok(profile);
  }
  let profile = Profile::new_for(user_id);
  tx.insert_profile(&profile).await?;
  info!(user_id = %user_id, "Profile created on demand.");
  Ok(profile)
}

#[instrument(name = "handler::get_my_profile", skip_all, fields(user_id = %auth.id()))]
pub async fn get_my_profile_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.store.begin().await?;
  let profile = profile_or_create(&mut *tx, auth.id()).await?;
  tx.commit().await?;

  Ok(HttpResponse::Ok().json(ProfileView::new(profile, auth.user, &app_state.config.media_url)))
}

async fn update_profile(
  app_state: &AppState,
  auth: AuthenticatedUser,
  payload: ProfileUpdatePayload,
  partial: bool,
) -> Result<HttpResponse, AppError> {
  if let Some(phone) = payload.phone_number.as_deref() {
    if phone.trim().is_empty() {
      return Err(AppError::Validation("Phone number may not be blank.".to_string()));
    }
  }

  let mut user = auth.user;
  let mut tx = app_state.store.begin().await?;
  let mut profile = profile_or_create(&mut *tx, user.id).await?;

  if partial {
    if let Some(phone) = payload.phone_number {
      profile.phone_number = phone;
    }
    if let Some(address) = payload.address {
      profile.address = Some(address);
    }
    if let Some(picture) = payload.profile_picture {
      profile.profile_picture = Some(picture);
    }
  } else {
    profile.phone_number = payload.phone_number.unwrap_or_else(|| DEFAULT_PHONE_NUMBER.to_string());
    profile.address = payload.address;
    profile.profile_picture = payload.profile_picture;
  }
  tx.update_profile(&profile).await?;

  if apply_role_flags(&mut user, payload.is_farmer.as_ref(), payload.is_buyer.as_ref()) {
    tx.update_user(&user).await?;
    info!(is_farmer = user.is_farmer, is_buyer = user.is_buyer, "User roles updated.");
  }
  tx.commit().await?;

  info!("Profile updated.");
  Ok(HttpResponse::Ok().json(ProfileView::new(profile, user, &app_state.config.media_url)))
}

#[instrument(name = "handler::replace_my_profile", skip_all, fields(user_id = %auth.id()))]
pub async fn replace_my_profile_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<ProfileUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  update_profile(&app_state, auth, req_payload.into_inner(), false).await
}

#[instrument(name = "handler::patch_my_profile", skip_all, fields(user_id = %auth.id()))]
pub async fn patch_my_profile_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<ProfileUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  update_profile(&app_state, auth, req_payload.into_inner(), true).await
}

#[instrument(name = "handler::list_users", skip_all)]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth.require_staff()?;
  let mut tx = app_state.store.begin().await?;
  let users = tx.list_users().await?;
  Ok(HttpResponse::Ok().json(users))
}
