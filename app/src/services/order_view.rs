// agro_market/src/services/order_view.rs

//! Assembles API views of orders from their rows.

use crate::errors::Result as AppResult;
use crate::models::{Order, OrderDetail, OrderItem, OrderItemDetail};
use crate::store::StoreTx;

pub async fn item_detail(tx: &mut dyn StoreTx, item: OrderItem) -> AppResult<OrderItemDetail> {
  let product = tx.product_by_id(item.product_id).await?;
  Ok(OrderItemDetail {
    id: item.id,
    order_id: item.order_id,
    product,
    quantity: item.quantity,
    price: item.price,
  })
}

pub async fn order_detail(tx: &mut dyn StoreTx, order: Order) -> AppResult<OrderDetail> {
  let rows = tx.items_for_order(order.id).await?;
  let mut items = Vec::with_capacity(rows.len());
  for row in rows {
    items.push(item_detail(tx, row).await?);
  }
  let delivery = tx.delivery_by_order(order.id).await?;
  let payment = tx.payment_by_order(order.id).await?;
  Ok(OrderDetail {
    order,
    items,
    delivery,
    payment,
  })
}
