// agro_market/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{
  auth_handlers, delivery_handlers, notification_handlers, order_handlers, payment_handlers, product_handlers,
  profile_handlers, review_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Mounts every endpoint under `/api`.
///
/// Paths are declared without a trailing slash; the app is expected to be
/// wrapped in `NormalizePath::trim()` so `/api/orders/` and `/api/orders`
/// both resolve.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/token/refresh", web::post().to(auth_handlers::refresh_token_handler)),
      )
      .service(
        web::scope("/users")
          .route("", web::get().to(profile_handlers::list_users_handler))
          .service(
            web::resource("/profile/me")
              .route(web::get().to(profile_handlers::get_my_profile_handler))
              .route(web::put().to(profile_handlers::replace_my_profile_handler))
              .route(web::patch().to(profile_handlers::patch_my_profile_handler)),
          ),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          .service(
            web::resource("/{product_id}")
              .route(web::get().to(product_handlers::get_product_handler))
              .route(web::put().to(product_handlers::replace_product_handler))
              .route(web::patch().to(product_handlers::patch_product_handler))
              .route(web::delete().to(product_handlers::delete_product_handler)),
          ),
      )
      .service(
        web::resource("/categories")
          .route(web::get().to(product_handlers::list_categories_handler))
          .route(web::post().to(product_handlers::create_category_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
      )
      .service(
        web::scope("/order-items")
          .route("", web::get().to(order_handlers::list_order_items_handler))
          .route("", web::post().to(order_handlers::add_order_item_handler))
          .route("/{item_id}", web::get().to(order_handlers::get_order_item_handler)),
      )
      .service(
        web::scope("/paypal")
          .route("/create-order", web::post().to(payment_handlers::create_paypal_order_handler))
          .route("/capture-order", web::post().to(payment_handlers::capture_paypal_order_handler)),
      )
      .service(
        web::scope("/payments")
          .route("", web::get().to(payment_handlers::list_payments_handler))
          .route("/{payment_id}", web::get().to(payment_handlers::get_payment_handler)),
      )
      .service(
        web::resource("/deliveries/{order_id}")
          .route(web::get().to(delivery_handlers::get_delivery_handler))
          .route(web::patch().to(delivery_handlers::update_delivery_handler)),
      )
      .service(
        web::scope("/reviews")
          .route("", web::get().to(review_handlers::list_reviews_handler))
          .route("", web::post().to(review_handlers::create_review_handler))
          .route("/{review_id}", web::delete().to(review_handlers::delete_review_handler)),
      )
      .service(
        web::scope("/notifications")
          .route("", web::get().to(notification_handlers::list_notifications_handler))
          .route("/{notification_id}/read", web::post().to(notification_handlers::mark_notification_read_handler))
          .route("/{notification_id}", web::delete().to(notification_handlers::delete_notification_handler)),
      ),
  );
}
