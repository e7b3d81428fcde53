// agro_market/src/flows/order_flow.rs

//! Order creation: one Order with its items, a Delivery and a pending Payment,
//! written in a single transaction together with the stock decrements.

use crate::errors::AppError;
use crate::flows::common_steps;
use crate::flows::contexts::CreateOrderCtxData;
use crate::models::{
  payment::DEFAULT_PAYMENT_METHOD, Delivery, DeliveryStatus, Order, OrderItem, OrderStatus, Payment, PaymentStatus,
};
use crate::services::notification_service;
use agro_flow::{Flow, FlowContext, FlowRegistry, StepControl};
use chrono::Utc;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

pub fn register_order_flow(registry: &FlowRegistry<AppError>) {
  let mut flow = Flow::<CreateOrderCtxData, AppError>::new(&[
    ("validate_order_input", false, None),
    ("begin_order_transaction", false, None),
    ("snapshot_prices_and_check_stock", false, None),
    ("create_order_record", false, None),
    ("create_order_items", false, None),
    ("decrement_product_stock", false, None),
    ("create_delivery_record", false, None),
    ("create_pending_payment", false, None),
    ("commit_order_transaction", false, None),
    ("notify_buyer", true, None),
  ]);

  flow.on("validate_order_input", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.lines.is_empty() {
        return Err(AppError::Validation("An order needs at least one item.".to_string()));
      }
      if let Some(line) = guard.lines.iter().find(|l| l.quantity <= 0) {
        warn!(product_id = %line.product_id, quantity = line.quantity, "Non-positive quantity requested.");
        return Err(AppError::Validation(format!(
          "Quantity for product {} must be a positive integer.",
          line.product_id
        )));
      }
      if guard.delivery_address.trim().is_empty() {
        return Err(AppError::Validation("A delivery address is required.".to_string()));
      }
      Ok(StepControl::Continue)
    })
  });

  flow.on("begin_order_transaction", common_steps::begin_transaction::<CreateOrderCtxData>);

  flow.on("snapshot_prices_and_check_stock", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let lines = ctx_data.read().lines.clone();
      let mut tx = ctx_data.read().tx.take()?;
      let priced = common_steps::price_lines(&mut *tx, &lines).await?;
      ctx_data.read().tx.put(tx);

      let total = common_steps::total_of(&priced);
      event!(Level::DEBUG, lines = priced.len(), %total, "Prices captured.");
      let mut guard = ctx_data.write();
      guard.priced_lines = priced;
      guard.total_price = total;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("create_order_record", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let order = {
        let guard = ctx_data.read();
        Order {
          id: Uuid::new_v4(),
          buyer_id: guard.buyer_id,
          total_price: guard.total_price,
          status: OrderStatus::Pending,
          created_at: Utc::now(),
        }
      };

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_order(&order).await?;
      ctx_data.read().tx.put(tx);

      info!(order_id = %order.id, total_price = %order.total_price, "Order record created.");
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("create_order_items", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let items: Vec<OrderItem> = {
        let guard = ctx_data.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|o| o.id)
          .ok_or_else(|| AppError::Internal("Items step reached without an order.".to_string()))?;
        guard
          .priced_lines
          .iter()
          .map(|line| OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.unit_price,
          })
          .collect()
      };

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_order_items(&items).await?;
      ctx_data.read().tx.put(tx);

      ctx_data.write().items = items;
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("decrement_product_stock", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let lines = ctx_data.read().priced_lines.clone();
      let mut tx = ctx_data.read().tx.take()?;
      common_steps::reserve_stock(&mut *tx, &lines).await?;
      ctx_data.read().tx.put(tx);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("create_delivery_record", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let delivery = {
        let guard = ctx_data.read();
        Delivery {
          id: Uuid::new_v4(),
          order_id: guard
            .order
            .as_ref()
            .map(|o| o.id)
            .ok_or_else(|| AppError::Internal("Delivery step reached without an order.".to_string()))?,
          delivery_address: guard.delivery_address.trim().to_string(),
          status: DeliveryStatus::Pending,
          delivery_agent: None,
        }
      };

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_delivery(&delivery).await?;
      ctx_data.read().tx.put(tx);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("create_pending_payment", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let payment = {
        let guard = ctx_data.read();
        let order = guard
          .order
          .as_ref()
          .ok_or_else(|| AppError::Internal("Payment step reached without an order.".to_string()))?;
        Payment {
          id: Uuid::new_v4(),
          order_id: order.id,
          amount: order.total_price,
          status: PaymentStatus::Pending,
          transaction_id: None,
          payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
          paypal_order_id: None,
          paypal_payment_id: None,
          created_at: Utc::now(),
        }
      };

      let mut tx = ctx_data.read().tx.take()?;
      tx.insert_payment(&payment).await?;
      ctx_data.read().tx.put(tx);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flow.on("commit_order_transaction", common_steps::commit_transaction::<CreateOrderCtxData>);

  flow.on("notify_buyer", |ctx_data: FlowContext<CreateOrderCtxData>| {
    Box::pin(async move {
      let (store, buyer_id, order_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.buyer_id, guard.order.as_ref().map(|o| o.id))
      };
      let Some(order_id) = order_id else {
        return Ok::<_, AppError>(StepControl::Continue);
      };

      let sent = notification_service::notify(
        store.as_ref(),
        buyer_id,
        format!("Your order {} has been placed.", order_id),
      )
      .await;
      ctx_data.write().buyer_notified = sent;
      Ok(StepControl::Continue)
    })
  });

  registry.register(flow);
  info!("Order creation flow registered.");
}
