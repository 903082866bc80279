//! Order placement, status machine and order queries.

pub mod placement;
mod query;
mod service;
mod transition;

pub use placement::{LineRequest, PlaceOrder};
pub use query::{ListOrders, OrderPage};
pub use service::{DEFAULT_MAX_PAGE_SIZE, OrderService, OrderServiceConfig};
pub use transition::TransitionPolicy;
