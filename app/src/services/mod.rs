// agro_market/src/services/mod.rs

pub mod auth_service;
pub mod notification_service;
pub mod order_view;
pub mod token_service;
