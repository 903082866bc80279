//! Shared data model for the order management backend.
//!
//! Identifiers, exact money amounts, order statuses and the product / order
//! records exchanged between the store, domain and API crates.

mod model;
mod money;
mod status;
mod types;

pub use model::{Order, OrderDetails, OrderItem, Product};
pub use money::Money;
pub use status::{OrderStatus, UnknownStatus};
pub use types::{CustomerId, OrderId, OrderItemId, ProductId};
