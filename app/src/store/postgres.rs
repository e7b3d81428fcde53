// agro_market/src/store/postgres.rs

use super::{Store, StoreTx, PRODUCT_ORDERED};
use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Category, Delivery, Notification, Order, OrderItem, OrderStatus, Payment, Product, Profile, Review, User,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{event, Level};
use uuid::Uuid;

const FOREIGN_KEY_VIOLATION: &str = "23503";

const USER_COLUMNS: &str =
  "id, username, email, first_name, last_name, password_hash, is_farmer, is_buyer, is_staff, date_joined";
const PRODUCT_COLUMNS: &str =
  "id, name, description, price, quantity, farmer_id, category_id, image_url, created_at";
const PAYMENT_COLUMNS: &str =
  "id, order_id, amount, status, transaction_id, payment_method, paypal_order_id, paypal_payment_id, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgTx { tx }))
  }
}

struct PgTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
  async fn insert_user(&mut self, user: &User) -> AppResult<()> {
    sqlx::query(&format!(
      "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
      USER_COLUMNS
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_farmer)
    .bind(user.is_buyer)
    .bind(user.is_staff)
    .bind(user.date_joined)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn user_by_id(&mut self, id: Uuid) -> AppResult<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn identity_taken(&mut self, username: &str, email: &str) -> AppResult<(bool, bool)> {
    Ok(
      sqlx::query_as::<_, (bool, bool)>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1)), \
         EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($2))",
      )
      .bind(username)
      .bind(email)
      .fetch_one(&mut *self.tx)
      .await?,
    )
  }

  async fn update_user(&mut self, user: &User) -> AppResult<()> {
    sqlx::query(
      "UPDATE users SET email = $2, first_name = $3, last_name = $4, is_farmer = $5, is_buyer = $6, is_staff = $7 \
       WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.is_farmer)
    .bind(user.is_buyer)
    .bind(user.is_staff)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn list_users(&mut self) -> AppResult<Vec<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS))
        .fetch_all(&mut *self.tx)
        .await?,
    )
  }

  async fn insert_profile(&mut self, profile: &Profile) -> AppResult<()> {
    sqlx::query(
      "INSERT INTO profiles (id, user_id, phone_number, address, profile_picture) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(profile.id)
    .bind(profile.user_id)
    .bind(&profile.phone_number)
    .bind(&profile.address)
    .bind(&profile.profile_picture)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn profile_by_user(&mut self, user_id: Uuid) -> AppResult<Option<Profile>> {
    Ok(
      sqlx::query_as::<_, Profile>(
        "SELECT id, user_id, phone_number, address, profile_picture FROM profiles WHERE user_id = $1",
      )
      .bind(user_id)
      .fetch_optional(&mut *self.tx)
      .await?,
    )
  }

  async fn update_profile(&mut self, profile: &Profile) -> AppResult<()> {
    sqlx::query("UPDATE profiles SET phone_number = $2, address = $3, profile_picture = $4 WHERE id = $1")
      .bind(profile.id)
      .bind(&profile.phone_number)
      .bind(&profile.address)
      .bind(&profile.profile_picture)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn list_categories(&mut self) -> AppResult<Vec<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(&mut *self.tx)
        .await?,
    )
  }

  async fn category_by_name(&mut self, name: &str) -> AppResult<Option<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE LOWER(name) = LOWER($1)")
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn category_by_id(&mut self, id: Uuid) -> AppResult<Option<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn insert_category(&mut self, category: &Category) -> AppResult<()> {
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
      .bind(category.id)
      .bind(&category.name)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn list_products(&mut self) -> AppResult<Vec<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products ORDER BY name ASC", PRODUCT_COLUMNS))
        .fetch_all(&mut *self.tx)
        .await?,
    )
  }

  async fn product_by_id(&mut self, id: Uuid) -> AppResult<Option<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn insert_product(&mut self, product: &Product) -> AppResult<()> {
    sqlx::query(&format!(
      "INSERT INTO products ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
      PRODUCT_COLUMNS
    ))
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.quantity)
    .bind(product.farmer_id)
    .bind(product.category_id)
    .bind(&product.image_url)
    .bind(product.created_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn update_product(&mut self, product: &Product) -> AppResult<()> {
    sqlx::query(
      "UPDATE products SET name = $2, description = $3, price = $4, quantity = $5, category_id = $6, image_url = $7 \
       WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.quantity)
    .bind(product.category_id)
    .bind(&product.image_url)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn delete_product(&mut self, id: Uuid) -> AppResult<bool> {
    // order_items references products with ON DELETE RESTRICT.
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&mut *self.tx)
      .await
      .map_err(|e| {
        let still_ordered =
          matches!(&e, sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION));
        if still_ordered {
          AppError::StateConflict(PRODUCT_ORDERED.to_string())
        } else {
          AppError::from(e)
        }
      })?;
    Ok(result.rows_affected() > 0)
  }

  async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<bool> {
    let result = sqlx::query("UPDATE products SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1")
      .bind(quantity)
      .bind(product_id)
      .execute(&mut *self.tx)
      .await?;
    event!(Level::DEBUG, %product_id, quantity, rows = result.rows_affected(), "Conditional stock decrement.");
    Ok(result.rows_affected() == 1)
  }

  async fn insert_order(&mut self, order: &Order) -> AppResult<()> {
    sqlx::query("INSERT INTO orders (id, buyer_id, total_price, status, created_at) VALUES ($1, $2, $3, $4, $5)")
      .bind(order.id)
      .bind(order.buyer_id)
      .bind(order.total_price)
      .bind(order.status)
      .bind(order.created_at)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn order_by_id(&mut self, id: Uuid) -> AppResult<Option<Order>> {
    Ok(
      sqlx::query_as::<_, Order>("SELECT id, buyer_id, total_price, status, created_at FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn list_orders(&mut self, buyer_id: Option<Uuid>) -> AppResult<Vec<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(
        "SELECT id, buyer_id, total_price, status, created_at FROM orders \
         WHERE $1::uuid IS NULL OR buyer_id = $1 ORDER BY created_at DESC",
      )
      .bind(buyer_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn update_order_status(&mut self, id: Uuid, status: OrderStatus) -> AppResult<()> {
    sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
      .bind(id)
      .bind(status)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn update_order_total(&mut self, id: Uuid, total: Decimal) -> AppResult<()> {
    sqlx::query("UPDATE orders SET total_price = $2 WHERE id = $1")
      .bind(id)
      .bind(total)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn insert_order_items(&mut self, items: &[OrderItem]) -> AppResult<()> {
    for item in items {
      sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5)")
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *self.tx)
        .await?;
    }
    Ok(())
  }

  async fn items_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, quantity, price FROM order_items WHERE order_id = $1",
      )
      .bind(order_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn list_order_items(&mut self, buyer_id: Option<Uuid>) -> AppResult<Vec<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "SELECT i.id, i.order_id, i.product_id, i.quantity, i.price FROM order_items i \
         JOIN orders o ON o.id = i.order_id WHERE $1::uuid IS NULL OR o.buyer_id = $1",
      )
      .bind(buyer_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn order_item_by_id(&mut self, id: Uuid) -> AppResult<Option<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>("SELECT id, order_id, product_id, quantity, price FROM order_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn insert_delivery(&mut self, delivery: &Delivery) -> AppResult<()> {
    sqlx::query(
      "INSERT INTO deliveries (id, order_id, delivery_address, status, delivery_agent) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(delivery.id)
    .bind(delivery.order_id)
    .bind(&delivery.delivery_address)
    .bind(delivery.status)
    .bind(&delivery.delivery_agent)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn delivery_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Delivery>> {
    Ok(
      sqlx::query_as::<_, Delivery>(
        "SELECT id, order_id, delivery_address, status, delivery_agent FROM deliveries WHERE order_id = $1",
      )
      .bind(order_id)
      .fetch_optional(&mut *self.tx)
      .await?,
    )
  }

  async fn update_delivery(&mut self, delivery: &Delivery) -> AppResult<()> {
    sqlx::query("UPDATE deliveries SET delivery_address = $2, status = $3, delivery_agent = $4 WHERE id = $1")
      .bind(delivery.id)
      .bind(&delivery.delivery_address)
      .bind(delivery.status)
      .bind(&delivery.delivery_agent)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()> {
    sqlx::query(&format!(
      "INSERT INTO payments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
      PAYMENT_COLUMNS
    ))
    .bind(payment.id)
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(&payment.transaction_id)
    .bind(&payment.payment_method)
    .bind(&payment.paypal_order_id)
    .bind(&payment.paypal_payment_id)
    .bind(payment.created_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn payment_by_id(&mut self, id: Uuid) -> AppResult<Option<Payment>> {
    Ok(
      sqlx::query_as::<_, Payment>(&format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn payment_by_order(&mut self, order_id: Uuid) -> AppResult<Option<Payment>> {
    Ok(
      sqlx::query_as::<_, Payment>(&format!("SELECT {} FROM payments WHERE order_id = $1", PAYMENT_COLUMNS))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn payment_for_capture(
    &mut self,
    paypal_order_id: &str,
    order_id: Uuid,
    buyer_id: Uuid,
  ) -> AppResult<Option<Payment>> {
    Ok(
      sqlx::query_as::<_, Payment>(
        "SELECT p.id, p.order_id, p.amount, p.status, p.transaction_id, p.payment_method, p.paypal_order_id, \
         p.paypal_payment_id, p.created_at FROM payments p JOIN orders o ON o.id = p.order_id \
         WHERE p.paypal_order_id = $1 AND p.order_id = $2 AND o.buyer_id = $3 FOR UPDATE OF p",
      )
      .bind(paypal_order_id)
      .bind(order_id)
      .bind(buyer_id)
      .fetch_optional(&mut *self.tx)
      .await?,
    )
  }

  async fn list_payments(&mut self) -> AppResult<Vec<Payment>> {
    Ok(
      sqlx::query_as::<_, Payment>(&format!("SELECT {} FROM payments ORDER BY created_at DESC", PAYMENT_COLUMNS))
        .fetch_all(&mut *self.tx)
        .await?,
    )
  }

  async fn update_payment(&mut self, payment: &Payment) -> AppResult<()> {
    sqlx::query(
      "UPDATE payments SET amount = $2, status = $3, transaction_id = $4, payment_method = $5, \
       paypal_order_id = $6, paypal_payment_id = $7 WHERE id = $1",
    )
    .bind(payment.id)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(&payment.transaction_id)
    .bind(&payment.payment_method)
    .bind(&payment.paypal_order_id)
    .bind(&payment.paypal_payment_id)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn list_reviews(&mut self, product_id: Option<Uuid>) -> AppResult<Vec<Review>> {
    Ok(
      sqlx::query_as::<_, Review>(
        "SELECT id, product_id, user_id, rating, comment, created_at FROM reviews \
         WHERE $1::uuid IS NULL OR product_id = $1 ORDER BY created_at DESC",
      )
      .bind(product_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn review_by_id(&mut self, id: Uuid) -> AppResult<Option<Review>> {
    Ok(
      sqlx::query_as::<_, Review>("SELECT id, product_id, user_id, rating, comment, created_at FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn insert_review(&mut self, review: &Review) -> AppResult<()> {
    sqlx::query(
      "INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(review.id)
    .bind(review.product_id)
    .bind(review.user_id)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(review.created_at)
    .execute(&mut *self.tx)
    .await?;
    Ok(())
  }

  async fn delete_review(&mut self, id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
      .bind(id)
      .execute(&mut *self.tx)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn insert_notification(&mut self, notification: &Notification) -> AppResult<()> {
    sqlx::query("INSERT INTO notifications (id, user_id, message, is_read, created_at) VALUES ($1, $2, $3, $4, $5)")
      .bind(notification.id)
      .bind(notification.user_id)
      .bind(&notification.message)
      .bind(notification.is_read)
      .bind(notification.created_at)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn list_notifications(&mut self, user_id: Uuid) -> AppResult<Vec<Notification>> {
    Ok(
      sqlx::query_as::<_, Notification>(
        "SELECT id, user_id, message, is_read, created_at FROM notifications WHERE user_id = $1 \
         ORDER BY created_at DESC",
      )
      .bind(user_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn notification_by_id(&mut self, id: Uuid) -> AppResult<Option<Notification>> {
    Ok(
      sqlx::query_as::<_, Notification>("SELECT id, user_id, message, is_read, created_at FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?,
    )
  }

  async fn mark_notification_read(&mut self, id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
      .bind(id)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn delete_notification(&mut self, id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
      .bind(id)
      .execute(&mut *self.tx)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn commit(self: Box<Self>) -> AppResult<()> {
    self.tx.commit().await?;
    Ok(())
  }
}
