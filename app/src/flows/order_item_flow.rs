// agro_market/src/flows/order_item_flow.rs

//! Adds one item to an existing order while its payment is still `Pending`,
//! keeping the order total and payment amount equal to the sum of its items.

use crate::errors::AppError;
use crate::flows::common_steps;
use crate::flows::contexts::AddOrderItemCtxData;
use crate::models::{OrderItem, PaymentStatus};
use agro_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

pub fn register_order_item_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<AddOrderItemCtxData, AppError>::new(&[
    ("validate_item_input", false, None),
    ("begin_item_transaction", false, None),
    ("load_open_order", false, None),
    ("snapshot_price_and_check_stock", false, None),
    ("create_order_item", false, None),
    ("decrement_product_stock", false, None),
    ("recompute_order_totals", false, None),
    ("commit_item_transaction", false, None),
  ]);

  flow.on("validate_item_input", |ctx_data: FlowContext<AddOrderItemCtxData>| {
    Box::pin(async move {
      if ctx_data.read().line.quantity <= 0 {
        return Err(AppError::Validation("Quantity must be a positive integer.".to_string()));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("begin_item_transaction", common_steps::begin_transaction::<AddOrderItemCtxData>);

  flow.on("load_open_order", |ctx_data: FlowContext<AddOrderItemCtxData>| {
    Box::pin(async move {
      let (order_id, buyer_id) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.buyer_id)
      };

      let mut tx = ctx_data.read().tx.take()?;
      let order = tx
        .order_by_id(order_id)
        .await?
        .filter(|o| o.buyer_id == buyer_id)
        .ok_or_else(|| AppError::NotFound("Order not found.".to_string()))?;
      let payment = tx
        .payment_by_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment record not found for this order.".to_string()))?;
      if payment.status != PaymentStatus::Pending {
        warn!(%order_id, payment_status = %payment.status, "Item added to an order that is no longer open.");
        return Err(AppError::StateConflict(format!(
          "Cannot add items to an order whose payment is '{}'.",
          payment.status
        )));
      }
      ctx_data.read().tx.put(tx);

      let mut guard = ctx_data.write();
      guard.order = Some(order);
      guard.payment = Some(payment);
      Ok(StepControl::Continue)
    })
  });

  flow.on("snapshot_price_and_check_stock", |ctx_data: FlowContext<AddOrderItemCtxData>| {
    Box::pin(async move {
      let line = ctx_data.read().line;
      let mut tx = ctx_data.read().tx.take()?;
      let mut priced = common_steps::price_lines(&mut *tx, &[line]).await?;
      ctx_data.read().tx.put(tx);

      ctx_data.write().priced_line = priced.pop();
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("create_order_item", |ctx_data: FlowContext<AddOrderItemCtxData>| {
    Box::pin(async move {
      let item = {
        let guard = ctx_data.read();
        let line = guard
          .priced_line
          .as_ref()
          .ok_or_else(|| AppError::Internal("Item step reached without a price.".to_string()))?;
        OrderItem {
          id: Uuid::new_v4(),
          order_id: guard.order_id,
          product_id: line.product_id,
          quantity: line.quantity,
          price: line.unit_price,
        }
      };

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_order_items(std::slice::from_ref(&item)).await?;
      ctx_data.read().tx.put(tx);

      ctx_data.write().created_item = Some(item);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("decrement_product_stock", |ctx_data: FlowContext<AddOrderItemCtxData>| {
    Box::pin(async move {
      let line = ctx_data.read().priced_line.clone();
      let Some(line) = line else {
        return Err(AppError::Internal("Stock step reached without a price.".to_string()));
      };
      let mut tx = ctx_data.read().tx.take()?;
      common_steps::reserve_stock(&mut *tx, std::slice::from_ref(&line)).await?;
      ctx_data.read().tx.put(tx);
      Ok(StepControl::Continue)
    })
  });

  flow.on("recompute_order_totals", |ctx_data: FlowContext<AddOrderItemCtxData>| {
    Box::pin(async move {
      let (order_id, payment) = {
        let guard = ctx_data.read();
        (guard.order_id, guard.payment.clone())
      };
      let Some(mut payment) = payment else {
        return Err(AppError::Internal("Totals step reached without a payment.".to_string()));
      };

      let mut tx = ctx_data.read().tx.take()?;
      let total: Decimal = tx.items_for_order(order_id).await?.iter().map(OrderItem::line_total).sum();
      tx.update_order_total(order_id, total).await?;
      payment.amount = total;
      tx.update_payment(&payment).await?;
      ctx_data.read().tx.put(tx);

      info!(%order_id, %total, "Order total recomputed after adding an item.");
      let mut guard = ctx_data.write();
      if let Some(order) = guard.order.as_mut() {
        order.total_price = total;
      }
      guard.payment = Some(payment);
      Ok(StepControl::Continue)
    })
  });

  flow.on("commit_item_transaction", common_steps::commit_transaction::<AddOrderItemCtxData>);

  registry.register(flow);
  info!("Add-order-item flow registered.");
}
