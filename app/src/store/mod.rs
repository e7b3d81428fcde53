// agro_market/src/store/mod.rs

//! Storage behind a unit-of-work interface.
//!
//! [`Store::begin`] opens a transaction; every read and write goes through the
//! returned [`StoreTx`]. Dropping a `StoreTx` without calling
//! [`StoreTx::commit`] rolls back everything it wrote.

pub mod memory;
pub mod postgres;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Category, Delivery, Notification, Order, OrderItem, OrderStatus, Payment, Product, Profile, Review, User,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

pub(crate) const PRODUCT_ORDERED: &str = "Product has already been ordered and cannot be deleted.";

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
  async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
  // users / profiles
  async fn insert_user(&mut self, user: &User) -> AppResult<()>;
  async fn user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>>;
  async fn user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;
  /// Returns `(username_taken, email_taken)`; both comparisons ignore case.
  async fn identity_taken(&mut self, username: &str, email: &str) -> AppResult<(bool, bool)>;
  async fn update_user(&mut self, user: &User) -> AppResult<()>;
  async fn list_users(&mut self) -> AppResult<Vec<User>>;
  async fn insert_profile(&mut self, profile: &Profile) -> AppResult<()>;
  async fn profile_by_user(&mut self, user_id: Uuid) -> AppResult<Option<Profile>>;
  async fn update_profile(&mut self, profile: &Profile) -> AppResult<()>;

  // catalog
  async fn list_categories(&mut self) -> AppResult<Vec<Category>>;
  async fn category_by_name(&mut self, name: &str) -> AppResult<Option<Category>>;
  async fn category_by_id(&mut self, id: Uuid) -> AppResult<Option<Category>>;
  async fn insert_category(&mut self, category: &Category) -> AppResult<()>;
  async fn list_products(&mut self) -> AppResult<Vec<Product>>;
  async fn product_by_id(&mut self, id: Uuid) -> AppResult<Option<Product>>;
  async fn insert_product(&mut self, product: &Product) -> AppResult<()>;
  async fn update_product(&mut self, product: &Product) -> AppResult<()>;
  /// Fails with `StateConflict` when any order item still references the
  /// product; ordered history is never deleted with it.
  async fn delete_product(&mut self, id: Uuid) -> AppResult<bool>;
  /// Removes `quantity` units only if at least that many are in stock.
  /// Returns `false` and changes nothing otherwise.
  async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<bool>;

  // orders
  async fn insert_order(&mut self, order: &Order) -> AppResult<()>;
  async fn order_by_id(&mut self, id: Uuid) -> AppResult<Option<Order>>;
  /// Orders of `buyer_id`, or every order when `None`. Newest first.
  async fn list_orders(&mut self, buyer_id: Option<Uuid>) -> AppResult<Vec<Order>>;
  async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> AppResult<()>;
  async fn update_order_total(&mut self, id: Uuid, total: Decimal) -> AppResult<()>;
  async fn insert_order_items(&mut self, items: &[OrderItem]) -> AppResult<()>;
  async fn items_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>>;
  async fn list_order_items(&mut self, buyer_id: Option<Uuid>) -> AppResult<Vec<OrderItem>>;
  async fn order_item_by_id(&mut self, id: Uuid) -> AppResult<Option<OrderItem>>;

  // logistics
  async fn insert_delivery(&mut self, delivery: &Delivery) -> AppResult<()>;
  async fn delivery_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Delivery>>;
  async fn update_delivery(&mut self, delivery: &Delivery) -> AppResult<()>;

  // payments
  async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()>;
  async fn payment_by_id(&mut self, id: Uuid) -> AppResult<Option<Payment>>;
  async fn payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>>;
  /// The payment opened as `paypal_order_id` for `order_id`, if that order belongs to `buyer_id`.
  async fn payment_for_capture(
    &mut self,
    paypal_order_id: &str,
    order_id: Uuid,
    buyer_id: Uuid,
  ) -> AppResult<Option<Payment>>;
  async fn list_payments(&mut self) -> AppResult<Vec<Payment>>;
  async fn update_payment(&mut self, payment: &Payment) -> AppResult<()>;

  // reviews
  async fn list_reviews(&mut self, product_id: Option<Uuid>) -> AppResult<Vec<Review>>;
  async fn review_by_id(&mut self, id: Uuid) -> AppResult<Option<Review>>;
  async fn insert_review(&mut self, review: &Review) -> AppResult<()>;
  async fn delete_review(&mut self, id: Uuid) -> AppResult<bool>;

  // notifications
  async fn insert_notification(&mut self, notification: &Notification) -> AppResult<()>;
  async fn list_notifications(&mut self, user_id: Uuid) -> AppResult<Vec<Notification>>;
  async fn notification_by_id(&mut self, id: Uuid) -> AppResult<Option<Notification>>;
  async fn mark_notification_read(&mut self, id: Uuid) -> AppResult<()>;
  async fn delete_notification(&mut self, id: Uuid) -> AppResult<bool>;

  async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Holds a flow's open transaction between steps.
///
/// Steps `take` the transaction, work on it, and `put` it back. A step that
/// fails returns before `put`, which drops the transaction and rolls it back.
#[derive(Default)]
pub struct TxSlot(Mutex<Option<Box<dyn StoreTx>>>);

impl TxSlot {
  pub fn take(&self) -> AppResult<Box<dyn StoreTx>> {
    self
      .0
      .lock()
      .take()
      .ok_or_else(|| AppError::Internal("No open transaction for this flow.".to_string()))
  }

  pub fn put(&self, tx: Box<dyn StoreTx>) {
    *self.0.lock() = Some(tx);
  }

  pub fn is_open(&self) -> bool {
    self.0.lock().is_some()
  }
}

impl std::fmt::Debug for TxSlot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("TxSlot").field(&self.is_open()).finish()
  }
}
