// agro_market/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::gateway::PaymentGateway;
use crate::services::token_service::TokenService;
use crate::store::Store;
use agro_flow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub tokens: Arc<TokenService>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Builds the state and registers every flow on a fresh registry.
  pub fn new(
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<AppConfig>,
  ) -> Self {
    let state = Self {
      store,
      flows: Arc::new(FlowRegistry::new()),
      gateway,
      tokens: Arc::new(TokenService::new(&config.jwt)),
      config,
    };
    crate::flows::register_all_flows(&state.flows);
    state
  }
}
