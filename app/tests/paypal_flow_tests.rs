// tests/paypal_flow_tests.rs

mod common;

use agro_flow::{FlowContext, FlowOutcome};
use agro_market::errors::AppError;
use agro_market::flows::contexts::{CreateOrderCtxData, OrderLineInput, PayPalCaptureCtxData, PayPalCreateCtxData};
use agro_market::gateway::{CaptureOutcome, GatewayError};
use agro_market::models::{Order, OrderStatus, PaymentStatus, User};
use common::TestApp;
use uuid::Uuid;

struct Fixture {
  app: TestApp,
  buyer: User,
  order: Order,
}

async fn fixture() -> Fixture {
  let app = TestApp::new();
  let farmer = app.seed_user("farmer_joe", true, false).await;
  let buyer = app.seed_user("buyer_ann", false, false).await;
  let maize = app.seed_product(farmer.id, "Maize", "10.00", 5).await;
  let beans = app.seed_product(farmer.id, "Beans", "5.00", 3).await;

  let ctx = FlowContext::new(CreateOrderCtxData::new(
    app.state.clone(),
    buyer.id,
    vec![
      OrderLineInput { product_id: maize.id, quantity: 2 },
      OrderLineInput { product_id: beans.id, quantity: 1 },
    ],
    "12 Market Rd".to_string(),
  ));
  app.state.flows.run(ctx.clone()).await.unwrap();
  let order = ctx.write().order.take().unwrap();

  Fixture { app, buyer, order }
}

async fn open_session(app: &TestApp, buyer_id: Uuid, order_id: Uuid) -> (Result<FlowOutcome, AppError>, Option<String>) {
  let ctx = FlowContext::new(PayPalCreateCtxData::new(app.state.clone(), buyer_id, order_id));
  let result = app.state.flows.run(ctx.clone()).await;
  let session = ctx.read().session_id.clone();
  (result, session)
}

async fn capture(
  app: &TestApp,
  buyer_id: Uuid,
  paypal_order_id: &str,
  order_id: Uuid,
) -> (Result<FlowOutcome, AppError>, bool) {
  let ctx = FlowContext::new(PayPalCaptureCtxData::new(
    app.state.clone(),
    buyer_id,
    paypal_order_id.to_string(),
    order_id,
  ));
  let result = app.state.flows.run(ctx.clone()).await;
  let already_completed = ctx.read().already_completed;
  (result, already_completed)
}

#[tokio::test]
async fn create_opens_a_session_and_marks_payment_pending_paypal() {
  let Fixture { app, buyer, order } = fixture().await;

  let (result, session) = open_session(&app, buyer.id, order.id).await;
  assert_eq!(result.unwrap(), FlowOutcome::Completed);
  assert_eq!(session.as_deref(), Some("PAYPAL-SESSION-1"));

  let payment = app.payment(order.id).await;
  assert_eq!(payment.status, PaymentStatus::PendingPayPal);
  assert_eq!(payment.paypal_order_id.as_deref(), Some("PAYPAL-SESSION-1"));
  assert_eq!(payment.payment_method, "PayPal");

  let request = app.gateway.last_request.lock().clone().unwrap();
  assert_eq!(request.amount, "25.00");
  assert_eq!(request.custom_id, order.id.to_string());
  assert_eq!(request.invoice_id, format!("INV-{}-{}", order.id, payment.id));
}

#[tokio::test]
async fn create_refuses_completed_payment_without_calling_provider() {
  let Fixture { app, buyer, order } = fixture().await;
  let mut payment = app.payment(order.id).await;
  payment.status = PaymentStatus::Completed;
  app.save_payment(&payment).await;

  let (result, _) = open_session(&app, buyer.id, order.id).await;
  assert!(matches!(result, Err(AppError::StateConflict(_))));
  assert_eq!(app.gateway.creates(), 0);
  assert_eq!(app.payment(order.id).await.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn create_commits_failed_status_when_provider_errors() {
  let Fixture { app, buyer, order } = fixture().await;
  app.gateway.fail_create_with(GatewayError::Transport("connection reset".to_string()));

  let (result, _) = open_session(&app, buyer.id, order.id).await;
  assert!(matches!(result, Err(AppError::Gateway { .. })));
  assert_eq!(app.gateway.creates(), 1);

  let payment = app.payment(order.id).await;
  assert_eq!(payment.status, PaymentStatus::Failed);
  assert!(payment.paypal_order_id.is_none());
}

#[tokio::test]
async fn create_can_retry_after_a_failure() {
  let Fixture { app, buyer, order } = fixture().await;
  app.gateway.fail_create_with(GatewayError::Transport("timeout".to_string()));
  let (first, _) = open_session(&app, buyer.id, order.id).await;
  assert!(first.is_err());

  *app.gateway.create_result.lock() = Ok("PAYPAL-SESSION-2".to_string());
  let (second, session) = open_session(&app, buyer.id, order.id).await;
  assert_eq!(second.unwrap(), FlowOutcome::Completed);
  assert_eq!(session.as_deref(), Some("PAYPAL-SESSION-2"));
  assert_eq!(app.payment(order.id).await.status, PaymentStatus::PendingPayPal);
}

#[tokio::test]
async fn create_for_another_buyers_order_is_not_found() {
  let Fixture { app, order, .. } = fixture().await;
  let intruder = app.seed_user("buyer_bob", false, false).await;

  let (result, _) = open_session(&app, intruder.id, order.id).await;
  assert!(matches!(result, Err(AppError::NotFound(_))));
  assert_eq!(app.gateway.creates(), 0);
}

#[tokio::test]
async fn capture_completes_payment_and_advances_order() {
  let Fixture { app, buyer, order } = fixture().await;
  let (_, session) = open_session(&app, buyer.id, order.id).await;
  let session = session.unwrap();

  let (result, already_completed) = capture(&app, buyer.id, &session, order.id).await;
  assert_eq!(result.unwrap(), FlowOutcome::Completed);
  assert!(!already_completed);

  let payment = app.payment(order.id).await;
  assert_eq!(payment.status, PaymentStatus::Completed);
  assert_eq!(payment.transaction_id.as_deref(), Some("CAPTURE-1"));
  assert_eq!(payment.paypal_payment_id.as_deref(), Some("CAPTURE-1"));
  assert_eq!(app.order(order.id).await.status, OrderStatus::Processing);
  assert_eq!(app.gateway.captures(), 1);
  // order placed + payment completed
  assert_eq!(app.notifications(buyer.id).await, 2);
}

#[tokio::test]
async fn second_capture_is_a_no_op() {
  let Fixture { app, buyer, order } = fixture().await;
  let (_, session) = open_session(&app, buyer.id, order.id).await;
  let session = session.unwrap();
  capture(&app, buyer.id, &session, order.id).await.0.unwrap();

  app.gateway.capture_returns(Ok(CaptureOutcome {
    status: "COMPLETED".to_string(),
    capture_id: Some("CAPTURE-OTHER".to_string()),
  }));
  let (result, already_completed) = capture(&app, buyer.id, &session, order.id).await;

  assert_eq!(result.unwrap(), FlowOutcome::Stopped);
  assert!(already_completed);
  assert_eq!(app.gateway.captures(), 1);
  assert_eq!(app.payment(order.id).await.transaction_id.as_deref(), Some("CAPTURE-1"));
}

#[tokio::test]
async fn capture_requires_a_pending_paypal_payment() {
  let Fixture { app, buyer, order } = fixture().await;
  let mut payment = app.payment(order.id).await;
  payment.paypal_order_id = Some("PAYPAL-SESSION-1".to_string());
  app.save_payment(&payment).await;

  let (result, _) = capture(&app, buyer.id, "PAYPAL-SESSION-1", order.id).await;
  assert!(matches!(result, Err(AppError::StateConflict(_))));
  assert_eq!(app.gateway.captures(), 0);
  assert_eq!(app.payment(order.id).await.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn declined_capture_marks_payment_failed_and_keeps_order_pending() {
  let Fixture { app, buyer, order } = fixture().await;
  let (_, session) = open_session(&app, buyer.id, order.id).await;
  app.gateway.capture_returns(Ok(CaptureOutcome {
    status: "DECLINED".to_string(),
    capture_id: None,
  }));

  let (result, _) = capture(&app, buyer.id, &session.unwrap(), order.id).await;
  let err = result.unwrap_err();
  assert_eq!(err.to_string(), "PayPal Capture Status: DECLINED.");

  assert_eq!(app.payment(order.id).await.status, PaymentStatus::Failed);
  assert_eq!(app.order(order.id).await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn capture_without_capture_id_settles_on_session_id() {
  let Fixture { app, buyer, order } = fixture().await;
  let (_, session) = open_session(&app, buyer.id, order.id).await;
  let session = session.unwrap();
  app.gateway.capture_returns(Ok(CaptureOutcome {
    status: "COMPLETED".to_string(),
    capture_id: None,
  }));

  capture(&app, buyer.id, &session, order.id).await.0.unwrap();

  let payment = app.payment(order.id).await;
  assert_eq!(payment.transaction_id.as_deref(), Some(session.as_str()));
  assert_eq!(payment.paypal_payment_id.as_deref(), Some(session.as_str()));
}

#[tokio::test]
async fn capture_gateway_error_marks_payment_failed() {
  let Fixture { app, buyer, order } = fixture().await;
  let (_, session) = open_session(&app, buyer.id, order.id).await;
  app.gateway.capture_returns(Err(GatewayError::Rejected {
    status: 422,
    message: "UNPROCESSABLE_ENTITY".to_string(),
    details: None,
  }));

  let (result, _) = capture(&app, buyer.id, &session.unwrap(), order.id).await;
  assert!(matches!(result, Err(AppError::Gateway { .. })));
  assert_eq!(app.payment(order.id).await.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn capture_by_another_buyer_is_not_found() {
  let Fixture { app, buyer, order } = fixture().await;
  let intruder = app.seed_user("buyer_bob", false, false).await;
  let (_, session) = open_session(&app, buyer.id, order.id).await;

  let (result, _) = capture(&app, intruder.id, &session.unwrap(), order.id).await;
  match result {
    Err(AppError::NotFound(msg)) => assert_eq!(msg, "Payment record not found or does not match your account."),
    other => panic!("expected not found, got {:?}", other),
  }
  assert_eq!(app.gateway.captures(), 0);
  assert_eq!(app.payment(order.id).await.status, PaymentStatus::PendingPayPal);
}
