// agro_market/src/flows/signup_flow.rs

use crate::errors::AppError;
use crate::flows::common_steps;
use crate::flows::contexts::SignupCtxData;
use crate::models::{Profile, User};
use crate::services::auth_service;
use agro_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use chrono::Utc;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

/// Registers the sign-up flow. The profile is created by its own step inside
/// the same transaction as the user.
pub fn register_signup_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_identity_available", false, None),
    ("begin_signup_transaction", false, None),
    ("create_user_record", false, None),
    ("create_profile_record", false, None),
    ("commit_signup_transaction", false, None),
  ]);

  flow.on("validate_signup_input", |ctx_data: FlowContext<SignupCtxData>| {
    Box::pin(async move {
      let (username, email, password_len) = {
        let guard = ctx_data.read();
        (guard.username.trim().to_string(), guard.email.trim().to_string(), guard.password.len())
      };

      event!(Level::DEBUG, %username, "Validating signup input.");
      if username.is_empty() {
        return Err(AppError::Validation("Username is required.".to_string()));
      }
      if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if password_len < auth_service::MIN_PASSWORD_LEN {
        warn!(password_len, "Password too short for signup.");
        return Err(AppError::Validation(format!(
          "Password must be at least {} characters long.",
          auth_service::MIN_PASSWORD_LEN
        )));
      }

      let mut guard = ctx_data.write();
      guard.username = username;
      guard.email = email;
      Ok(StepControl::Continue)
    })
  });

  flow.on("check_identity_available", |ctx_data: FlowContext<SignupCtxData>| {
    Box::pin(async move {
      let (store, username, email) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.username.clone(), guard.email.clone())
      };

      let mut tx = store.begin().await?;
      let (username_taken, email_taken) = tx.identity_taken(&username, &email).await?;
      drop(tx);

      if username_taken {
        return Err(AppError::Validation("A user with that username already exists.".to_string()));
      }
      if email_taken {
        return Err(AppError::Validation("An account with this email already exists.".to_string()));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("begin_signup_transaction", common_steps::begin_transaction::<SignupCtxData>);

  flow.on("create_user_record", |ctx_data: FlowContext<SignupCtxData>| {
    Box::pin(async move {
      let user = {
        let guard = ctx_data.read();
        User {
          id: Uuid::new_v4(),
          username: guard.username.clone(),
          email: guard.email.clone(),
          first_name: guard.first_name.clone(),
          last_name: guard.last_name.clone(),
          password_hash: auth_service::hash_password(&guard.password)?,
          is_farmer: guard.is_farmer,
          is_buyer: guard.is_buyer.unwrap_or(!guard.is_farmer),
          is_staff: false,
          date_joined: Utc::now(),
        }
      };

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_user(&user).await?;
      ctx_data.read().tx.put(tx);

      info!(user_id = %user.id, username = %user.username, "User record created.");
      ctx_data.write().created_user = Some(user);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("create_profile_record", |ctx_data: FlowContext<SignupCtxData>| {
    Box::pin(async move {
      let user_id = ctx_data
        .read()
        .created_user
        .as_ref()
        .map(|u| u.id)
        .ok_or_else(|| AppError::Internal("Profile step reached without a user.".to_string()))?;

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_profile(&Profile::new_for(user_id)).await?;
      ctx_data.read().tx.put(tx);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("commit_signup_transaction", common_steps::commit_transaction::<SignupCtxData>);

  registry.register(flow);
  info!("Sign-up flow registered.");
}
