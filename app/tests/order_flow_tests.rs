// tests/order_flow_tests.rs

mod common;

use agro_flow::{FlowContext, FlowOutcome};
use agro_market::errors::AppError;
use agro_market::flows::contexts::{AddOrderItemCtxData, CreateOrderCtxData, OrderLineInput};
use agro_market::models::{DeliveryStatus, Order, OrderStatus, PaymentStatus};
use common::{dec, TestApp};
use uuid::Uuid;

fn line(product_id: Uuid, quantity: i32) -> OrderLineInput {
  OrderLineInput { product_id, quantity }
}

async fn place_order(app: &TestApp, buyer_id: Uuid, lines: Vec<OrderLineInput>, address: &str) -> Result<Order, AppError> {
  let ctx = FlowContext::new(CreateOrderCtxData::new(
    app.state.clone(),
    buyer_id,
    lines,
    address.to_string(),
  ));
  let outcome = app.state.flows.run(ctx.clone()).await?;
  assert_eq!(outcome, FlowOutcome::Completed);
  let order = ctx.write().order.take().expect("order recorded in context");
  Ok(order)
}

async fn add_item(app: &TestApp, buyer_id: Uuid, order_id: Uuid, line: OrderLineInput) -> Result<FlowOutcome, AppError> {
  let ctx = FlowContext::new(AddOrderItemCtxData::new(app.state.clone(), buyer_id, order_id, line));
  app.state.flows.run(ctx).await
}

#[tokio::test]
async fn order_creation_writes_every_record_and_takes_stock() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;
  let beans = app.seed_product(farmer.id, "Beans", "5.00", 3).await;

  let order = place_order(&app, buyer.id, vec![line(maize.id, 2), line(beans.id, 1)], "12 Market Rd")
    .await
    .unwrap();

  assert_eq!(order.total_price, dec("25.00"));
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.buyer_id, buyer.id);

  let items = app.items(order.id).await;
  assert_eq!(items.len(), 2);
  let maize_item = items.iter().find(|i| i.product_id == maize.id).unwrap();
  assert_eq!(maize_item.quantity, 2);
  assert_eq!(maize_item.price, dec("10.00"));

  assert_eq!(app.product(maize.id).await.quantity, 3);
  assert_eq!(app.product(beans.id).await.quantity, 2);

  let delivery = app.delivery(order.id).await.unwrap();
  assert_eq!(delivery.delivery_address, "12 Market Rd");
  assert_eq!(delivery.status, DeliveryStatus::Pending);

  let payment = app.payment(order.id).await;
  assert_eq!(payment.amount, dec("25.00"));
  assert_eq!(payment.status, PaymentStatus::Pending);
  assert_eq!(payment.payment_method, "N/A");
  assert!(payment.paypal_order_id.is_none());

  assert_eq!(app.notifications(buyer.id).await, 1);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;
  let beans = app.seed_product(farmer.id, "Beans", "5.00", 1).await;

  let err = place_order(&app, buyer.id, vec![line(maize.id, 2), line(beans.id, 2)], "12 Market Rd")
    .await
    .unwrap_err();

  match err {
    AppError::InsufficientStock { product, available } => {
      assert_eq!(product, "Beans");
      assert_eq!(available, 1);
    }
    other => panic!("expected insufficient stock, got {:?}", other),
  }
  assert!(app.orders().await.is_empty());
  assert!(app.payments().await.is_empty());
  assert_eq!(app.product(maize.id).await.quantity, 5);
  assert_eq!(app.product(beans.id).await.quantity, 1);
  assert_eq!(app.notifications(buyer.id).await, 0);
}

#[tokio::test]
async fn duplicate_lines_are_checked_against_combined_quantity() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 3).await;

  let err = place_order(&app, buyer.id, vec![line(maize.id, 2), line(maize.id, 2)], "12 Market Rd")
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::InsufficientStock { available: 3, .. }));
  assert_eq!(app.product(maize.id).await.quantity, 3);
  assert!(app.orders().await.is_empty());
}

#[tokio::test]
async fn huge_duplicate_lines_are_refused_without_overflow() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;

  let err = place_order(
    &app,
    buyer.id,
    vec![line(maize.id, 2_000_000_000), line(maize.id, 2_000_000_000)],
    "12 Market Rd",
  )
  .await
  .unwrap_err();

  assert!(matches!(err, AppError::InsufficientStock { available: 5, .. }));
  assert_eq!(app.product(maize.id).await.quantity, 5);
  assert!(app.orders().await.is_empty());
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 3).await;

  let empty = place_order(&app, buyer.id, vec![], "12 Market Rd").await.unwrap_err();
  assert!(matches!(empty, AppError::Validation(_)));

  let zero = place_order(&app, buyer.id, vec![line(maize.id, 0)], "12 Market Rd").await.unwrap_err();
  assert!(matches!(zero, AppError::Validation(_)));

  let blank = place_order(&app, buyer.id, vec![line(maize.id, 1)], "   ").await.unwrap_err();
  assert!(matches!(blank, AppError::Validation(_)));

  let unknown = place_order(&app, buyer.id, vec![line(Uuid::new_v4(), 1)], "12 Market Rd")
    .await
    .unwrap_err();
  match unknown {
    AppError::Validation(msg) => assert!(msg.contains("Invalid product id")),
    other => panic!("expected validation error, got {:?}", other),
  }

  assert!(app.orders().await.is_empty());
  assert_eq!(app.product(maize.id).await.quantity, 3);
}

#[tokio::test]
async fn adding_an_item_recomputes_order_and_payment_totals() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;
  let beans = app.seed_product(farmer.id, "Beans", "2.50", 4).await;

  let order = place_order(&app, buyer.id, vec![line(maize.id, 1)], "Farm Gate 3").await.unwrap();
  let outcome = add_item(&app, buyer.id, order.id, line(beans.id, 2)).await.unwrap();
  assert_eq!(outcome, FlowOutcome::Completed);

  assert_eq!(app.order(order.id).await.total_price, dec("15.00"));
  assert_eq!(app.payment(order.id).await.amount, dec("15.00"));
  assert_eq!(app.items(order.id).await.len(), 2);
  assert_eq!(app.product(beans.id).await.quantity, 2);
}

#[tokio::test]
async fn adding_an_item_requires_a_pending_payment() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;

  let order = place_order(&app, buyer.id, vec![line(maize.id, 1)], "Farm Gate 3").await.unwrap();
  let mut payment = app.payment(order.id).await;
  payment.status = PaymentStatus::PendingPayPal;
  app.save_payment(&payment).await;

  let err = add_item(&app, buyer.id, order.id, line(maize.id, 1)).await.unwrap_err();
  assert!(matches!(err, AppError::StateConflict(_)));
  assert_eq!(app.product(maize.id).await.quantity, 4);
  assert_eq!(app.items(order.id).await.len(), 1);
}

#[tokio::test]
async fn adding_an_item_to_someone_elses_order_is_not_found() {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let intruder = app.seed_user("buyer_bob", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;

  let order = place_order(&app, buyer.id, vec![line(maize.id, 1)], "Farm Gate 3").await.unwrap();
  let err = add_item(&app, intruder.id, order.id, line(maize.id, 1)).await.unwrap_err();

  assert!(matches!(err, AppError::NotFound(_)));
  assert_eq!(app.order(order.id).await.total_price, dec("10.00"));
}
