// agro_market/src/services/token_service.rs

//! Stateless HS256 access and refresh tokens.

use crate::config::JwtConfig;
use crate::errors::{AppError, Result as AppResult};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub kind: TokenKind,
  pub iat: i64,
  pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
  pub access: String,
  pub refresh: String,
}

pub struct TokenService {
  encoding: EncodingKey,
  decoding: DecodingKey,
  access_ttl: chrono::Duration,
  refresh_ttl: chrono::Duration,
}

impl TokenService {
  pub fn new(config: &JwtConfig) -> Self {
    Self {
      encoding: EncodingKey::from_secret(config.secret.as_bytes()),
      decoding: DecodingKey::from_secret(config.secret.as_bytes()),
      access_ttl: config.access_ttl,
      refresh_ttl: config.refresh_ttl,
    }
  }

  fn issue(&self, user_id: Uuid, kind: TokenKind) -> AppResult<String> {
    let now = Utc::now();
    let ttl = match kind {
      TokenKind::Access => self.access_ttl,
      TokenKind::Refresh => self.refresh_ttl,
    };
    let claims = Claims {
      sub: user_id,
      kind,
      iat: now.timestamp(),
      exp: (now + ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &self.encoding)
      .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
  }

  pub fn issue_pair(&self, user_id: Uuid) -> AppResult<TokenPair> {
    Ok(TokenPair {
      access: self.issue(user_id, TokenKind::Access)?,
      refresh: self.issue(user_id, TokenKind::Refresh)?,
    })
  }

  pub fn issue_access(&self, user_id: Uuid) -> AppResult<String> {
    self.issue(user_id, TokenKind::Access)
  }

  /// Validates signature, expiry and kind; returns the user id.
  pub fn verify(&self, token: &str, expected: TokenKind) -> AppResult<Uuid> {
    let data = decode::<Claims>(token, &self.decoding, &Validation::default())
      .map_err(|e| AppError::Auth(format!("Invalid or expired token: {}", e)))?;
    if data.claims.kind != expected {
      return Err(AppError::Auth("Token has the wrong type.".to_string()));
    }
    Ok(data.claims.sub)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn service(access_minutes: i64) -> TokenService {
    TokenService::new(&JwtConfig {
      secret: "test-secret".to_string(),
      access_ttl: chrono::Duration::minutes(access_minutes),
      refresh_ttl: chrono::Duration::days(7),
    })
  }

  #[test]
  fn pair_round_trips_with_kind_check() {
    let svc = service(60);
    let user_id = Uuid::new_v4();
    let pair = svc.issue_pair(user_id).unwrap();

    assert_eq!(svc.verify(&pair.access, TokenKind::Access).unwrap(), user_id);
    assert_eq!(svc.verify(&pair.refresh, TokenKind::Refresh).unwrap(), user_id);
    assert!(matches!(svc.verify(&pair.refresh, TokenKind::Access), Err(AppError::Auth(_))));
  }

  #[test]
  fn expired_token_is_rejected() {
    // Well past the default 60s leeway.
    let svc = service(-10);
    let token = svc.issue_access(Uuid::new_v4()).unwrap();
    assert!(matches!(svc.verify(&token, TokenKind::Access), Err(AppError::Auth(_))));
  }

  #[test]
  fn foreign_signature_is_rejected() {
    let token = service(60).issue_access(Uuid::new_v4()).unwrap();
    let other = TokenService::new(&JwtConfig {
      secret: "another-secret".to_string(),
      access_ttl: chrono::Duration::minutes(60),
      refresh_ttl: chrono::Duration::days(7),
    });
    assert!(other.verify(&token, TokenKind::Access).is_err());
  }
}
