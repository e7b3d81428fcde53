// agro_market/src/lib.rs

//! Agro marketplace backend: users, catalog, orders, deliveries and PayPal
//! payments over actix-web, with every multi-record write driven by an
//! `agro_flow` workflow.

pub mod config;
pub mod errors;
pub mod flows;
pub mod gateway;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
