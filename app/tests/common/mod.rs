// tests/common/mod.rs
#![allow(dead_code)]

use agro_market::config::{AppConfig, JwtConfig, LogFormat, PayPalConfig, PayPalMode};
use agro_market::gateway::{CaptureOutcome, CheckoutRequest, GatewayError, PaymentGateway};
use agro_market::models::{Delivery, Order, OrderItem, Payment, Product, User};
use agro_market::services::auth_service::hash_password;
use agro_market::state::AppState;
use agro_market::store::{MemoryStore, Store};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "harvest-2024";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn dec(raw: &str) -> Decimal {
  Decimal::from_str(raw).unwrap()
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "postgres://unused".to_string(),
    database_max_connections: 1,
    run_migrations: false,
    jwt: JwtConfig {
      secret: "integration-test-secret".to_string(),
      access_ttl: chrono::Duration::minutes(60),
      refresh_ttl: chrono::Duration::days(7),
    },
    paypal: PayPalConfig {
      mode: PayPalMode::Sandbox,
      client_id: "client".to_string(),
      client_secret: "secret".to_string(),
      currency: "USD".to_string(),
      timeout: Duration::from_secs(5),
      base_url_override: None,
    },
    media_url: "/media/".to_string(),
    log_format: LogFormat::Pretty,
  }
}

/// Scripted stand-in for PayPal that counts every call it receives.
pub struct FakeGateway {
  pub create_calls: AtomicUsize,
  pub capture_calls: AtomicUsize,
  pub create_result: Mutex<Result<String, GatewayError>>,
  pub capture_result: Mutex<Result<CaptureOutcome, GatewayError>>,
  pub last_request: Mutex<Option<CheckoutRequest>>,
}

impl FakeGateway {
  pub fn new() -> Self {
    Self {
      create_calls: AtomicUsize::new(0),
      capture_calls: AtomicUsize::new(0),
      create_result: Mutex::new(Ok("PAYPAL-SESSION-1".to_string())),
      capture_result: Mutex::new(Ok(CaptureOutcome {
        status: "COMPLETED".to_string(),
        capture_id: Some("CAPTURE-1".to_string()),
      })),
      last_request: Mutex::new(None),
    }
  }

  pub fn fail_create_with(&self, err: GatewayError) {
    *self.create_result.lock() = Err(err);
  }

  pub fn capture_returns(&self, result: Result<CaptureOutcome, GatewayError>) {
    *self.capture_result.lock() = result;
  }

  pub fn creates(&self) -> usize {
    self.create_calls.load(Ordering::SeqCst)
  }

  pub fn captures(&self) -> usize {
    self.capture_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_order(&self, request: &CheckoutRequest) -> Result<String, GatewayError> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    *self.last_request.lock() = Some(request.clone());
    self.create_result.lock().clone()
  }

  async fn capture_order(&self, _session_id: &str) -> Result<CaptureOutcome, GatewayError> {
    self.capture_calls.fetch_add(1, Ordering::SeqCst);
    self.capture_result.lock().clone()
  }
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<FakeGateway>,
}

impl TestApp {
  pub fn new() -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(FakeGateway::new());
    let state = AppState::new(store.clone(), gateway.clone(), Arc::new(test_config()));
    Self { state, store, gateway }
  }

  pub async fn seed_user(&self, username: &str, is_farmer: bool, is_staff: bool) -> User {
    let user = User {
      id: Uuid::new_v4(),
      username: username.to_string(),
      email: format!("{}@example.com", username),
      first_name: None,
      last_name: None,
      password_hash: hash_password(TEST_PASSWORD).unwrap(),
      is_farmer,
      is_buyer: !is_farmer,
      is_staff,
      date_joined: Utc::now(),
    };
    let mut tx = self.store.begin().await.unwrap();
    tx.insert_user(&user).await.unwrap();
    tx.commit().await.unwrap();
    user
  }

  pub async fn seed_product(&self, farmer_id: Uuid, name: &str, price: &str, quantity: i32) -> Product {
    let product = Product {
      id: Uuid::new_v4(),
      name: name.to_string(),
      description: String::new(),
      price: dec(price),
      quantity,
      farmer_id,
      category_id: None,
      image_url: None,
      created_at: Utc::now(),
    };
    let mut tx = self.store.begin().await.unwrap();
    tx.insert_product(&product).await.unwrap();
    tx.commit().await.unwrap();
    product
  }

  pub async fn product(&self, id: Uuid) -> Product {
    let mut tx = self.store.begin().await.unwrap();
    tx.product_by_id(id).await.unwrap().unwrap()
  }

  pub async fn order(&self, id: Uuid) -> Order {
    let mut tx = self.store.begin().await.unwrap();
    tx.order_by_id(id).await.unwrap().unwrap()
  }

  pub async fn orders(&self) -> Vec<Order> {
    let mut tx = self.store.begin().await.unwrap();
    tx.list_orders(None).await.unwrap()
  }

  pub async fn items(&self, order_id: Uuid) -> Vec<OrderItem> {
    let mut tx = self.store.begin().await.unwrap();
    tx.items_for_order(order_id).await.unwrap()
  }

  pub async fn delivery(&self, order_id: Uuid) -> Option<Delivery> {
    let mut tx = self.store.begin().await.unwrap();
    tx.delivery_by_order(order_id).await.unwrap()
  }

  pub async fn payment(&self, order_id: Uuid) -> Payment {
    let mut tx = self.store.begin().await.unwrap();
    tx.payment_by_order(order_id).await.unwrap().unwrap()
  }

  pub async fn payments(&self) -> Vec<Payment> {
    let mut tx = self.store.begin().await.unwrap();
    tx.list_payments().await.unwrap()
  }

  pub async fn notifications(&self, user_id: Uuid) -> usize {
    let mut tx = self.store.begin().await.unwrap();
    tx.list_notifications(user_id).await.unwrap().len()
  }

  pub async fn save_payment(&self, payment: &Payment) {
    let mut tx = self.store.begin().await.unwrap();
    tx.update_payment(payment).await.unwrap();
    tx.commit().await.unwrap();
  }
}
