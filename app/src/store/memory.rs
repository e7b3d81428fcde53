// agro_market/src/store/memory.rs

//! In-process store. Transactions are serialised: `begin` waits for the
//! previous transaction to finish, works on a copy of the data, and `commit`
//! swaps the copy in.

use super::{Store, StoreTx, PRODUCT_ORDERED};
use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Category, Delivery, Notification, Order, OrderItem, OrderStatus, Payment, Product, Profile, Review, User,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
  users: Vec<User>,
  profiles: Vec<Profile>,
  categories: Vec<Category>,
  products: Vec<Product>,
  orders: Vec<Order>,
  order_items: Vec<OrderItem>,
  deliveries: Vec<Delivery>,
  payments: Vec<Payment>,
  reviews: Vec<Review>,
  notifications: Vec<Notification>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
    let guard = self.tables.clone().lock_owned().await;
    let working = guard.clone();
    Ok(Box::new(MemoryTx { guard, working }))
  }
}

struct MemoryTx {
  guard: OwnedMutexGuard<Tables>,
  working: Tables,
}

fn upsert<T: Clone>(rows: &mut [T], value: &T, same: impl Fn(&T) -> bool) {
  if let Some(row) = rows.iter_mut().find(|r| same(r)) {
    *row = value.clone();
  }
}

fn remove<T>(rows: &mut Vec<T>, same: impl Fn(&T) -> bool) -> bool {
  let before = rows.len();
  rows.retain(|r| !same(r));
  rows.len() != before
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn insert_user(&mut self, user: &User) -> AppResult<()> {
    self.working.users.push(user.clone());
    Ok(())
  }

  async fn user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>> {
    Ok(self.working.users.iter().find(|u| u.id == id).cloned())
  }

  async fn user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
    Ok(self.working.users.iter().find(|u| u.username == username).cloned())
  }

  async fn identity_taken(&mut self, username: &str, email: &str) -> AppResult<(bool, bool)> {
    let users = &self.working.users;
    Ok((
      users.iter().any(|u| u.username.eq_ignore_ascii_case(username)),
      users.iter().any(|u| u.email.eq_ignore_ascii_case(email)),
    ))
  }

  async fn update_user(&mut self, user: &User) -> AppResult<()> {
    upsert(&mut self.working.users, user, |u| u.id == user.id);
    Ok(())
  }

  async fn list_users(&mut self) -> AppResult<Vec<User>> {
    let mut users = self.working.users.clone();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(users)
  }

  async fn insert_profile(&mut self, profile: &Profile) -> AppResult<()> {
    self.working.profiles.push(profile.clone());
    Ok(())
  }

  async fn profile_by_user(&mut self, user_id: Uuid) -> AppResult<Option<Profile>> {
    Ok(self.working.profiles.iter().find(|p| p.user_id == user_id).cloned())
  }

  async fn update_profile(&mut self, profile: &Profile) -> AppResult<()> {
    upsert(&mut self.working.profiles, profile, |p| p.id == profile.id);
    Ok(())
  }

  async fn list_categories(&mut self) -> AppResult<Vec<Category>> {
    let mut categories = self.working.categories.clone();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
  }

  async fn category_by_name(&mut self, name: &str) -> AppResult<Option<Category>> {
    Ok(
      self
        .working
        .categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .cloned(),
    )
  }

  async fn category_by_id(&mut self, id: Uuid) -> AppResult<Option<Category>> {
    Ok(self.working.categories.iter().find(|c| c.id == id).cloned())
  }

  async fn insert_category(&mut self, category: &Category) -> AppResult<()> {
    self.working.categories.push(category.clone());
    Ok(())
  }

  async fn list_products(&mut self) -> AppResult<Vec<Product>> {
    let mut products = self.working.products.clone();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn product_by_id(&mut self, id: Uuid) -> AppResult<Option<Product>> {
    Ok(self.working.products.iter().find(|p| p.id == id).cloned())
  }

  async fn insert_product(&mut self, product: &Product) -> AppResult<()> {
    self.working.products.push(product.clone());
    Ok(())
  }

  async fn update_product(&mut self, product: &Product) -> AppResult<()> {
    upsert(&mut self.working.products, product, |p| p.id == product.id);
    Ok(())
  }

  async fn delete_product(&mut self, id: Uuid) -> AppResult<bool> {
    if self.working.order_items.iter().any(|i| i.product_id == id) {
      return Err(AppError::StateConflict(PRODUCT_ORDERED.to_string()));
    }
    let removed = remove(&mut self.working.products, |p| p.id == id);
    if removed {
      remove(&mut self.working.reviews, |r| r.product_id == id);
    }
    Ok(removed)
  }

  async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<bool> {
    match self
      .working
      .products
      .iter_mut()
      .find(|p| p.id == product_id && p.quantity >= quantity)
    {
      Some(product) => {
        product.quantity -= quantity;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn insert_order(&mut self, order: &Order) -> AppResult<()> {
    self.working.orders.push(order.clone());
    Ok(())
  }

  async fn order_by_id(&mut self, id: Uuid) -> AppResult<Option<Order>> {
    Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
  }

  async fn list_orders(&mut self, buyer_id: Option<Uuid>) -> AppResult<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .working
      .orders
      .iter()
      .filter(|o| buyer_id.map_or(true, |b| o.buyer_id == b))
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> AppResult<()> {
    if let Some(order) = self.working.orders.iter_mut().find(|o| o.id == id) {
      order.status = status;
    }
    Ok(())
  }

  async fn update_order_total(&mut self, id: Uuid, total: Decimal) -> AppResult<()> {
    if let Some(order) = self.working.orders.iter_mut().find(|o| o.id == id) {
      order.total_price = total;
    }
    Ok(())
  }

  async fn insert_order_items(&mut self, items: &[OrderItem]) -> AppResult<()> {
    self.working.order_items.extend_from_slice(items);
    Ok(())
  }

  async fn items_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    Ok(
      self
        .working
        .order_items
        .iter()
        .filter(|i| i.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_order_items(&mut self, buyer_id: Option<Uuid>) -> AppResult<Vec<OrderItem>> {
    let orders = &self.working.orders;
    Ok(
      self
        .working
        .order_items
        .iter()
        .filter(|i| match buyer_id {
          None => true,
          Some(b) => orders.iter().any(|o| o.id == i.order_id && o.buyer_id == b),
        })
        .cloned()
        .collect(),
    )
  }

  async fn order_item_by_id(&mut self, id: Uuid) -> AppResult<Option<OrderItem>> {
    Ok(self.working.order_items.iter().find(|i| i.id == id).cloned())
  }

  async fn insert_delivery(&mut self, delivery: &Delivery) -> AppResult<()> {
    self.working.deliveries.push(delivery.clone());
    Ok(())
  }

  async fn delivery_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Delivery>> {
    Ok(self.working.deliveries.iter().find(|d| d.order_id == order_id).cloned())
  }

  async fn update_delivery(&mut self, delivery: &Delivery) -> AppResult<()> {
    upsert(&mut self.working.deliveries, delivery, |d| d.id == delivery.id);
    Ok(())
  }

  async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()> {
    self.working.payments.push(payment.clone());
    Ok(())
  }

  async fn payment_by_id(&mut self, id: Uuid) -> AppResult<Option<Payment>> {
    Ok(self.working.payments.iter().find(|p| p.id == id).cloned())
  }

  async fn payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>> {
    Ok(self.working.payments.iter().find(|p| p.order_id == order_id).cloned())
  }

  async fn payment_for_capture(
    &mut self,
    paypal_order_id: &str,
    order_id: Uuid,
    buyer_id: Uuid,
  ) -> AppResult<Option<Payment>> {
    let owned = self
      .working
      .orders
      .iter()
      .any(|o| o.id == order_id && o.buyer_id == buyer_id);
    if !owned {
      return Ok(None);
    }
    Ok(
      self
        .working
        .payments
        .iter()
        .find(|p| p.order_id == order_id && p.paypal_order_id.as_deref() == Some(paypal_order_id))
        .cloned(),
    )
  }

  async fn list_payments(&mut self) -> AppResult<Vec<Payment>> {
    let mut payments = self.working.payments.clone();
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(payments)
  }

  async fn update_payment(&mut self, payment: &Payment) -> AppResult<()> {
    upsert(&mut self.working.payments, payment, |p| p.id == payment.id);
    Ok(())
  }

  async fn list_reviews(&mut self, product_id: Option<Uuid>) -> AppResult<Vec<Review>> {
    let mut reviews: Vec<Review> = self
      .working
      .reviews
      .iter()
      .filter(|r| product_id.map_or(true, |p| r.product_id == p))
      .cloned()
      .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(reviews)
  }

  async fn review_by_id(&mut self, id: Uuid) -> AppResult<Option<Review>> {
    Ok(self.working.reviews.iter().find(|r| r.id == id).cloned())
  }

  async fn insert_review(&mut self, review: &Review) -> AppResult<()> {
    self.working.reviews.push(review.clone());
    Ok(())
  }

  async fn delete_review(&mut self, id: Uuid) -> AppResult<bool> {
    Ok(remove(&mut self.working.reviews, |r| r.id == id))
  }

  async fn insert_notification(&mut self, notification: &Notification) -> AppResult<()> {
    self.working.notifications.push(notification.clone());
    Ok(())
  }

  async fn list_notifications(&mut self, user_id: Uuid) -> AppResult<Vec<Notification>> {
    let mut notifications: Vec<Notification> = self
      .working
      .notifications
      .iter()
      .filter(|n| n.user_id == user_id)
      .cloned()
      .collect();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(notifications)
  }

  async fn notification_by_id(&mut self, id: Uuid) -> AppResult<Option<Notification>> {
    Ok(self.working.notifications.iter().find(|n| n.id == id).cloned())
  }

  async fn mark_notification_read(&mut self, id: Uuid) -> AppResult<()> {
    if let Some(n) = self.working.notifications.iter_mut().find(|n| n.id == id) {
      n.is_read = true;
    }
    Ok(())
  }

  async fn delete_notification(&mut self, id: Uuid) -> AppResult<bool> {
    Ok(remove(&mut self.working.notifications, |n| n.id == id))
  }

  async fn commit(self: Box<Self>) -> AppResult<()> {
    let MemoryTx { mut guard, working } = *self;
    *guard = working;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn product(quantity: i32) -> Product {
    Product {
      id: Uuid::new_v4(),
      name: "Cassava".to_string(),
      description: String::new(),
      price: Decimal::new(1000, 2),
      quantity,
      farmer_id: Uuid::new_v4(),
      category_id: None,
      image_url: None,
      created_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn dropped_transaction_discards_writes() {
    let store = MemoryStore::new();
    let p = product(5);

    let mut tx = store.begin().await.unwrap();
    tx.insert_product(&p).await.unwrap();
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.product_by_id(p.id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn conditional_decrement_never_goes_negative() {
    let store = MemoryStore::new();
    let p = product(3);
    let mut tx = store.begin().await.unwrap();
    tx.insert_product(&p).await.unwrap();

    assert!(tx.decrement_stock(p.id, 2).await.unwrap());
    assert!(!tx.decrement_stock(p.id, 2).await.unwrap());
    assert_eq!(tx.product_by_id(p.id).await.unwrap().unwrap().quantity, 1);
    tx.commit().await.unwrap();
  }
}
