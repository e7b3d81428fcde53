// tests/paypal_client_tests.rs

mod common;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use agro_market::gateway::{CheckoutRequest, GatewayError, PayPalClient, PaymentGateway};
use common::{setup_tracing, test_config};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Recorded {
  path: String,
  authorization: Option<String>,
  request_id: Option<String>,
  body: Option<Value>,
}

/// Local stand-in for the PayPal API: records each request and answers with
/// a fixed status and JSON body.
struct PayPalStub {
  seen: Mutex<Vec<Recorded>>,
  reply: (u16, Value),
}

async fn record(req: HttpRequest, body: web::Bytes, stub: web::Data<PayPalStub>) -> HttpResponse {
  let header = |name: &str| {
    req
      .headers()
      .get(name)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string)
  };
  stub.seen.lock().push(Recorded {
    path: req.path().to_string(),
    authorization: header("authorization"),
    request_id: header("paypal-request-id"),
    body: serde_json::from_slice(&body).ok(),
  });
  let (status, reply) = &stub.reply;
  HttpResponse::build(StatusCode::from_u16(*status).unwrap()).json(reply)
}

async fn start_stub(status: u16, reply: Value) -> (PayPalClient, web::Data<PayPalStub>, ServerHandle) {
  setup_tracing();
  let stub = web::Data::new(PayPalStub {
    seen: Mutex::new(Vec::new()),
    reply: (status, reply),
  });
  let shared = stub.clone();
  let server = HttpServer::new(move || App::new().app_data(shared.clone()).default_service(web::to(record)))
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
  let addr = server.addrs()[0];
  let server = server.run();
  let handle = server.handle();
  actix_rt::spawn(server);

  let mut config = test_config().paypal;
  config.base_url_override = Some(format!("http://{}/", addr));
  (PayPalClient::new(&config).unwrap(), stub, handle)
}

fn checkout() -> CheckoutRequest {
  CheckoutRequest {
    amount: "25.00".to_string(),
    currency: "USD".to_string(),
    description: "Order 42".to_string(),
    custom_id: "order-42".to_string(),
    invoice_id: "invoice-42".to_string(),
  }
}

#[actix_rt::test]
async fn create_order_sends_authenticated_capture_intent() {
  let (client, stub, handle) = start_stub(201, json!({ "id": "5O190127TN364715T", "status": "CREATED" })).await;

  let session_id = client.create_order(&checkout()).await.unwrap();
  assert_eq!(session_id, "5O190127TN364715T");

  let seen = stub.seen.lock().clone();
  assert_eq!(seen.len(), 1);
  let request = &seen[0];
  assert_eq!(request.path, "/v2/checkout/orders");
  // base64("client:secret")
  assert_eq!(request.authorization.as_deref(), Some("Basic Y2xpZW50OnNlY3JldA=="));
  assert_eq!(request.request_id.as_deref(), Some("invoice-42"));

  let body = request.body.as_ref().unwrap();
  assert_eq!(body["intent"], "CAPTURE");
  let unit = &body["purchase_units"][0];
  assert_eq!(unit["amount"]["value"], "25.00");
  assert_eq!(unit["amount"]["currency_code"], "USD");
  assert_eq!(unit["custom_id"], "order-42");
  assert_eq!(unit["invoice_id"], "invoice-42");

  handle.stop(false).await;
}

#[actix_rt::test]
async fn create_order_without_an_id_is_malformed() {
  let (client, _stub, handle) = start_stub(201, json!({ "status": "CREATED" })).await;

  let err = client.create_order(&checkout()).await.unwrap_err();
  assert!(matches!(err, GatewayError::Malformed(_)), "got {:?}", err);

  handle.stop(false).await;
}

#[actix_rt::test]
async fn provider_errors_become_rejections_with_details() {
  let (client, _stub, handle) = start_stub(
    422,
    json!({
      "name": "UNPROCESSABLE_ENTITY",
      "details": [{ "issue": "INSTRUMENT_DECLINED", "description": "The instrument was declined." }]
    }),
  )
  .await;

  match client.create_order(&checkout()).await.unwrap_err() {
    GatewayError::Rejected { status, message, details } => {
      assert_eq!(status, 422);
      assert_eq!(message, "The instrument was declined.");
      assert_eq!(details.unwrap()[0]["issue"], "INSTRUMENT_DECLINED");
    }
    other => panic!("unexpected {:?}", other),
  }

  handle.stop(false).await;
}

#[actix_rt::test]
async fn capture_reads_status_and_capture_id() {
  let (client, stub, handle) = start_stub(
    201,
    json!({
      "id": "5O190127TN364715T",
      "status": "completed",
      "purchase_units": [{ "payments": { "captures": [{ "id": "3C679366HH908993F" }] } }]
    }),
  )
  .await;

  let outcome = client.capture_order("5O190127TN364715T").await.unwrap();
  assert!(outcome.is_completed());
  assert_eq!(outcome.capture_id.as_deref(), Some("3C679366HH908993F"));

  let seen = stub.seen.lock().clone();
  assert_eq!(seen[0].path, "/v2/checkout/orders/5O190127TN364715T/capture");
  assert_eq!(seen[0].authorization.as_deref(), Some("Basic Y2xpZW50OnNlY3JldA=="));

  handle.stop(false).await;
}
