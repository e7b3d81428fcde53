// agro_market/src/flows/signin_flow.rs

use crate::errors::AppError;
use crate::flows::contexts::SigninCtxData;
use crate::services::auth_service;
use agro_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use tracing::{event, info, warn, Level};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

pub fn register_signin_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_username", false, None),
    ("verify_user_password", false, None),
    ("issue_tokens", false, None),
  ]);

  flow.on("validate_signin_input", |ctx_data: FlowContext<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.username.trim().is_empty() || guard.password.is_empty() {
        return Err(AppError::Validation("Username and password are required.".to_string()));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("fetch_user_by_username", |ctx_data: FlowContext<SigninCtxData>| {
    Box::pin(async move {
      let (store, username) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.username.trim().to_string())
      };

      event!(Level::DEBUG, %username, "Fetching user for signin.");
      let mut tx = store.begin().await?;
      let user = tx.user_by_username(&username).await?;
      drop(tx);

      match user {
        Some(user) => {
          ctx_data.write().user = Some(user);
          Ok(StepControl::Continue)
        }
        None => {
          warn!(%username, "Signin for unknown username.");
          Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
        }
      }
    })
  });

  flow.on("verify_user_password", |ctx_data: FlowContext<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let user = guard
        .user
        .as_ref()
        .ok_or_else(|| AppError::Internal("Password step reached without a user.".to_string()))?;
      if !auth_service::verify_password(&user.password_hash, &guard.password)? {
        warn!(user_id = %user.id, "Signin with wrong password.");
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("issue_tokens", |ctx_data: FlowContext<SigninCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let user_id = guard
        .user
        .as_ref()
        .map(|u| u.id)
        .ok_or_else(|| AppError::Internal("Token step reached without a user.".to_string()))?;
      let pair = guard.app_state.tokens.issue_pair(user_id)?;
      guard.tokens = Some(pair);
      info!(%user_id, "Signin successful.");
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Sign-in flow registered.");
}
