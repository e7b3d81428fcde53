// agro_market/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalMode {
  Sandbox,
  Live,
}

impl PayPalMode {
  pub fn api_base(self) -> &'static str {
    match self {
      PayPalMode::Sandbox => "https://api-m.sandbox.paypal.com",
      PayPalMode::Live => "https://api-m.paypal.com",
    }
  }
}

impl FromStr for PayPalMode {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "sandbox" => Ok(PayPalMode::Sandbox),
      "live" => Ok(PayPalMode::Live),
      other => Err(AppError::Config(format!(
        "Invalid PAYPAL_MODE '{}': expected 'sandbox' or 'live'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct PayPalConfig {
  pub mode: PayPalMode,
  pub client_id: String,
  pub client_secret: String,
  pub currency: String,
  pub timeout: Duration,
  /// Overrides the mode's base URL; used for proxies and local stubs.
  pub base_url_override: Option<String>,
}

impl PayPalConfig {
  pub fn base_url(&self) -> &str {
    self.base_url_override.as_deref().unwrap_or_else(|| self.mode.api_base())
  }
}

// Hand-written so the secret never reaches the logs.
impl std::fmt::Debug for PayPalConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PayPalConfig")
      .field("mode", &self.mode)
      .field("client_id", &self.client_id)
      .field("client_secret", &"[REDACTED]")
      .field("currency", &self.currency)
      .field("timeout", &self.timeout)
      .field("base_url", &self.base_url())
      .finish()
  }
}

#[derive(Clone)]
pub struct JwtConfig {
  pub secret: String,
  pub access_ttl: chrono::Duration,
  pub refresh_ttl: chrono::Duration,
}

impl std::fmt::Debug for JwtConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("JwtConfig")
      .field("secret", &"[REDACTED]")
      .field("access_ttl", &self.access_ttl)
      .field("refresh_ttl", &self.refresh_ttl)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub jwt: JwtConfig,
  pub paypal: PayPalConfig,
  pub media_url: String,
  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", get_env("SERVER_PORT").ok(), 8080u16)?;
    let database_url = get_env("DATABASE_URL")?;
    let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", get_env("DATABASE_MAX_CONNECTIONS").ok(), 10u32)?;
    let run_migrations = parse_var("RUN_MIGRATIONS", get_env("RUN_MIGRATIONS").ok(), true)?;

    let jwt = JwtConfig {
      secret: get_env("JWT_SECRET")?,
      access_ttl: chrono::Duration::minutes(parse_var(
        "JWT_ACCESS_TTL_MINUTES",
        get_env("JWT_ACCESS_TTL_MINUTES").ok(),
        1440i64,
      )?),
      refresh_ttl: chrono::Duration::days(parse_var(
        "JWT_REFRESH_TTL_DAYS",
        get_env("JWT_REFRESH_TTL_DAYS").ok(),
        7i64,
      )?),
    };

    let paypal = PayPalConfig {
      mode: get_env("PAYPAL_MODE").unwrap_or_else(|_| "sandbox".to_string()).parse()?,
      client_id: get_env("PAYPAL_CLIENT_ID")?,
      client_secret: get_env("PAYPAL_CLIENT_SECRET")?,
      currency: get_env("PAYPAL_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
      timeout: Duration::from_secs(parse_var("PAYPAL_TIMEOUT_SECS", get_env("PAYPAL_TIMEOUT_SECS").ok(), 30u64)?),
      base_url_override: get_env("PAYPAL_BASE_URL").ok().filter(|s| !s.is_empty()),
    };

    let media_url = get_env("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string());
    let log_format = match get_env("LOG_FORMAT").unwrap_or_default().to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      _ => LogFormat::Pretty,
    };

    tracing::info!(paypal_mode = ?paypal.mode, "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      run_migrations,
      jwt,
      paypal,
      media_url,
      log_format,
    })
  }
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
  }
}
