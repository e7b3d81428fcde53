// agro_market/src/main.rs

use agro_market::config::{AppConfig, LogFormat};
use agro_market::gateway::PayPalClient;
use agro_market::state::AppState;
use agro_market::store::PgStore;

use actix_web::middleware::NormalizePath;
use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  match format {
    LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    LogFormat::Pretty => tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_span_events(FmtSpan::CLOSE)
      .init(),
  }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  let config = AppConfig::from_env();
  init_tracing(config.as_ref().map_or(LogFormat::Pretty, |c| c.log_format));

  let app_config = Arc::new(config.map_err(|e| startup_error("Failed to load application configuration", e))?);
  tracing::info!(paypal_mode = ?app_config.paypal.mode, "Starting agro marketplace server...");

  let db_pool = PgPoolOptions::new()
    .max_connections(app_config.database_max_connections)
    .connect(&app_config.database_url)
    .await
    .map_err(|e| startup_error("Failed to connect to the database", e))?;
  tracing::info!("Connected to the database.");

  if app_config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&db_pool)
      .await
      .map_err(|e| startup_error("Failed to run database migrations", e))?;
    tracing::info!("Database migrations applied.");
  }

  let gateway =
    PayPalClient::new(&app_config.paypal).map_err(|e| startup_error("Failed to build the PayPal client", e))?;

  let app_state = AppState::new(Arc::new(PgStore::new(db_pool)), Arc::new(gateway), app_config.clone());

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(NormalizePath::trim())
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(agro_market::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
