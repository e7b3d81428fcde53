// agro_market/src/web/handlers/auth_handlers.rs

use actix_web::{cookie::Cookie, web, HttpResponse};
use agro_flow::{FlowContext, FlowOutcome};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::flows::contexts::{SigninCtxData, SignupCtxData};
use crate::services::token_service::TokenKind;
use crate::state::AppState;
use crate::store::TxSlot;
use crate::web::extractors::ACCESS_TOKEN_COOKIE;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub username: String,
  pub email: String,
  pub password: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  #[serde(default)]
  pub is_farmer: bool,
  pub is_buyer: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub username: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct RefreshRequestPayload {
  pub refresh: String,
}

#[instrument(
    name = "handler::signup",
    skip(app_state, req_payload),
    fields(username = %req_payload.username)
)]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = FlowContext::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    username: payload.username,
    email: payload.email,
    password: payload.password,
    first_name: payload.first_name,
    last_name: payload.last_name,
    is_farmer: payload.is_farmer,
    is_buyer: payload.is_buyer,
    tx: TxSlot::default(),
    created_user: None,
  });

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let user = ctx.write().created_user.take().ok_or_else(|| {
        warn!("Signup flow completed but no user was recorded in context.");
        AppError::Internal("Signup completed without creating a user.".to_string())
      })?;
      info!(user_id = %user.id, "User registered.");
      Ok(HttpResponse::Created().json(user))
    }
    Ok(FlowOutcome::Stopped) => {
      warn!("Signup flow was stopped by a step.");
      Err(AppError::Internal("Signup process was halted by an internal step.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Signup flow failed.");
      Err(app_err)
    }
  }
}

#[instrument(
    name = "handler::signin",
    skip(app_state, req_payload),
    fields(username = %req_payload.username)
)]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = FlowContext::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    username: payload.username,
    password: payload.password,
    user: None,
    tokens: None,
  });

  match app_state.flows.run(ctx.clone()).await {
    Ok(FlowOutcome::Completed) => {
      let (user_id, tokens) = {
        let mut guard = ctx.write();
        let user_id = guard.user.as_ref().map(|u| u.id);
        (user_id, guard.tokens.take())
      };
      let tokens = tokens.ok_or_else(|| {
        warn!("Signin flow completed but no tokens were issued.");
        AppError::Auth("Signin completed without issuing tokens.".to_string())
      })?;
      if let Some(user_id) = user_id {
        info!(user_id = %user_id, "Signin successful.");
      }

      let mut cookie = Cookie::new(ACCESS_TOKEN_COOKIE, tokens.access.clone());
      cookie.set_path("/");
      cookie.set_http_only(true);

      Ok(HttpResponse::Ok().cookie(cookie).json(tokens))
    }
    Ok(FlowOutcome::Stopped) => {
      warn!("Signin flow was stopped by a step.");
      Err(AppError::Auth("Authentication process was unexpectedly halted.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Signin flow failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::refresh_token", skip_all)]
pub async fn refresh_token_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RefreshRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = app_state.tokens.verify(&req_payload.refresh, TokenKind::Refresh)?;

  let mut tx = app_state.store.begin().await?;
  let exists = tx.user_by_id(user_id).await?.is_some();
  drop(tx);
  if !exists {
    return Err(AppError::Auth("User not found.".to_string()));
  }

  let access = app_state.tokens.issue_access(user_id)?;
  info!(user_id = %user_id, "Access token refreshed.");
  Ok(HttpResponse::Ok().json(json!({ "access": access })))
}
