// agro_market/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod delivery_handlers;
pub mod notification_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod product_handlers;
pub mod profile_handlers;
pub mod review_handlers;
