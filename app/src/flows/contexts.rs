// agro_market/src/flows/contexts.rs

//! Data carried through each flow. Handlers receive these wrapped in
//! `agro_flow::FlowContext`.

use crate::errors::AppError;
use crate::gateway::{CaptureOutcome, GatewayError};
use crate::models::{Order, OrderItem, Payment, User};
use crate::services::token_service::TokenPair;
use crate::state::AppState;
use crate::store::{Store, TxSlot};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Flows that hold an open transaction between steps.
pub trait Transactional: Send + Sync + 'static {
  fn store(&self) -> Arc<dyn Store>;
  fn tx_slot(&self) -> &TxSlot;
}

macro_rules! transactional {
  ($($ty:ty),* $(,)?) => {
    $(
      impl Transactional for $ty {
        fn store(&self) -> Arc<dyn Store> {
          self.app_state.store.clone()
        }

        fn tx_slot(&self) -> &TxSlot {
          &self.tx
        }
      }
    )*
  };
}

transactional!(
  SignupCtxData,
  CreateOrderCtxData,
  AddOrderItemCtxData,
  PayPalCreateCtxData,
  PayPalCaptureCtxData,
);

// --- users ---

pub struct SignupCtxData {
  pub app_state: AppState,
  pub username: String,
  pub email: String,
  pub password: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub is_farmer: bool,
  /// Defaults to `!is_farmer` when not supplied.
  pub is_buyer: Option<bool>,
  pub tx: TxSlot,
  pub created_user: Option<User>,
}

pub struct SigninCtxData {
  pub app_state: AppState,
  pub username: String,
  pub password: String,
  pub user: Option<User>,
  pub tokens: Option<TokenPair>,
}

// --- orders ---

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderLineInput {
  #[serde(alias = "product")]
  pub product_id: Uuid,
  pub quantity: i32,
}

/// A requested line with the product price captured at order time.
#[derive(Debug, Clone)]
pub struct PricedLine {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price: Decimal,
}

impl PricedLine {
  pub fn line_total(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }
}

pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub buyer_id: Uuid,
  pub lines: Vec<OrderLineInput>,
  pub delivery_address: String,
  pub tx: TxSlot,
  pub priced_lines: Vec<PricedLine>,
  pub total_price: Decimal,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
  pub buyer_notified: bool,
}

impl CreateOrderCtxData {
  pub fn new(app_state: AppState, buyer_id: Uuid, lines: Vec<OrderLineInput>, delivery_address: String) -> Self {
    Self {
      app_state,
      buyer_id,
      lines,
      delivery_address,
      tx: TxSlot::default(),
      priced_lines: Vec::new(),
      total_price: Decimal::ZERO,
      order: None,
      items: Vec::new(),
      buyer_notified: false,
    }
  }
}

pub struct AddOrderItemCtxData {
  pub app_state: AppState,
  pub buyer_id: Uuid,
  pub order_id: Uuid,
  pub line: OrderLineInput,
  pub tx: TxSlot,
  pub order: Option<Order>,
  pub payment: Option<Payment>,
  pub priced_line: Option<PricedLine>,
  pub created_item: Option<OrderItem>,
}

impl AddOrderItemCtxData {
  pub fn new(app_state: AppState, buyer_id: Uuid, order_id: Uuid, line: OrderLineInput) -> Self {
    Self {
      app_state,
      buyer_id,
      order_id,
      line,
      tx: TxSlot::default(),
      order: None,
      payment: None,
      priced_line: None,
      created_item: None,
    }
  }
}

// --- payments ---

pub struct PayPalCreateCtxData {
  pub app_state: AppState,
  pub buyer_id: Uuid,
  pub order_id: Uuid,
  pub tx: TxSlot,
  pub order: Option<Order>,
  pub payment: Option<Payment>,
  pub session_id: Option<String>,
  /// Set when the provider call failed; surfaced after the `Failed` status commits.
  pub provider_error: Option<GatewayError>,
}

impl PayPalCreateCtxData {
  pub fn new(app_state: AppState, buyer_id: Uuid, order_id: Uuid) -> Self {
    Self {
      app_state,
      buyer_id,
      order_id,
      tx: TxSlot::default(),
      order: None,
      payment: None,
      session_id: None,
      provider_error: None,
    }
  }
}

pub struct PayPalCaptureCtxData {
  pub app_state: AppState,
  pub buyer_id: Uuid,
  pub paypal_order_id: String,
  pub order_id: Uuid,
  pub tx: TxSlot,
  pub payment: Option<Payment>,
  pub already_completed: bool,
  pub outcome: Option<Result<CaptureOutcome, GatewayError>>,
  /// Set when the capture did not complete; surfaced after the `Failed` status commits.
  pub failure: Option<AppError>,
  pub buyer_notified: bool,
}

impl PayPalCaptureCtxData {
  pub fn new(app_state: AppState, buyer_id: Uuid, paypal_order_id: String, order_id: Uuid) -> Self {
    Self {
      app_state,
      buyer_id,
      paypal_order_id,
      order_id,
      tx: TxSlot::default(),
      payment: None,
      already_completed: false,
      outcome: None,
      failure: None,
      buyer_notified: false,
    }
  }
}
