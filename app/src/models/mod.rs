// agro_market/src/models/mod.rs

//! Row types shared by the stores, flows and HTTP handlers.

pub mod category;
pub mod delivery;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod profile;
pub mod review;
pub mod user;

pub use category::Category;
pub use delivery::{Delivery, DeliveryStatus};
pub use notification::Notification;
pub use order::{Order, OrderDetail, OrderStatus};
pub use order_item::{OrderItem, OrderItemDetail};
pub use payment::{Payment, PaymentStatus};
pub use product::Product;
pub use profile::Profile;
pub use review::Review;
pub use user::User;
