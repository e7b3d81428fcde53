// agro_market/src/flows/mod.rs

//! Business workflows run through `agro_flow`.

use crate::errors::AppError;
use agro_flow::FlowRegistry;

pub mod common_steps;
pub mod contexts;

pub mod order_flow;
pub mod order_item_flow;
pub mod paypal_capture_flow;
pub mod paypal_create_flow;
pub mod signin_flow;
pub mod signup_flow;

/// Registers every flow on `registry`. Called once when the state is built.
pub fn register_all_flows(registry: &FlowRegistry<AppError>) {
  tracing::info!("Registering flows...");

  signup_flow::register_signup_flow(registry);
  signin_flow::register_signin_flow(registry);
  order_flow::register_order_flow(registry);
  order_item_flow::register_order_item_flow(registry);
  paypal_create_flow::register_paypal_create_flow(registry);
  paypal_capture_flow::register_paypal_capture_flow(registry);

  tracing::info!("All flows registered.");
}
