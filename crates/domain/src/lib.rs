//! Domain layer for the order management backend.
//!
//! This crate provides:
//! - `OrderService`: all-or-nothing order placement against shared stock,
//!   status updates under a configurable `TransitionPolicy`, and paginated
//!   order queries
//! - `ProductCatalog`: product listing and demo catalog seeding
//! - `OrderError`, the error taxonomy every operation reports

pub mod catalog;
pub mod error;
pub mod order;

pub use catalog::ProductCatalog;
pub use error::{OrderError, Result};
pub use order::{
    DEFAULT_MAX_PAGE_SIZE, LineRequest, ListOrders, OrderPage, OrderService, OrderServiceConfig,
    PlaceOrder, TransitionPolicy,
};
