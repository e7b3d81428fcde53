// agro_market/src/web/extractors.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::User;
use crate::services::token_service::TokenKind;
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::debug;
use uuid::Uuid;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// The caller, resolved from an access token.
///
/// The token is read from `Authorization: Bearer ...` first and from the
/// `access_token` cookie otherwise. The user row is reloaded on every request
/// so role changes apply immediately.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
}

impl AuthenticatedUser {
  pub fn id(&self) -> Uuid {
    self.user.id
  }

  pub fn is_staff(&self) -> bool {
    self.user.is_staff
  }

  pub fn require_staff(&self) -> AppResult<()> {
    if self.user.is_staff {
      Ok(())
    } else {
      Err(AppError::Forbidden(
        "You do not have permission to perform this action.".to_string(),
      ))
    }
  }

  pub fn require_farmer(&self) -> AppResult<()> {
    if self.user.is_farmer {
      Ok(())
    } else {
      Err(AppError::Forbidden("Only farmers can perform this action.".to_string()))
    }
  }

  /// Buyer-scoped listings: `None` (everything) for staff, the caller otherwise.
  pub fn scope(&self) -> Option<Uuid> {
    if self.user.is_staff {
      None
    } else {
      Some(self.user.id)
    }
  }
}

fn token_from_request(req: &HttpRequest) -> Option<String> {
  let bearer = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(|token| token.trim().to_string())
    .filter(|token| !token.is_empty());

  bearer.or_else(|| req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = req.app_data::<web::Data<AppState>>().cloned();
    let token = token_from_request(req);

    Box::pin(async move {
      let app_state =
        app_state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let token = token
        .ok_or_else(|| AppError::Auth("Authentication credentials were not provided.".to_string()))?;

      let user_id = app_state.tokens.verify(&token, TokenKind::Access)?;

      // Read-only lookup; dropping the transaction is enough.
      let mut tx = app_state.store.begin().await?;
      let user = tx.user_by_id(user_id).await?;
      drop(tx);

      match user {
        Some(user) => {
          debug!(user_id = %user.id, "Request authenticated.");
          Ok(AuthenticatedUser { user })
        }
        None => Err(AppError::Auth("User not found.".to_string())),
      }
    })
  }
}
