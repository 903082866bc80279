//! Transactional storage for products and orders.
//!
//! The [`Store`] trait hands out [`Transaction`]s; every inventory and order
//! operation runs inside one. Two implementations are provided: an
//! in-memory store for tests and local runs, and a PostgreSQL store.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use query::OrderQuery;
pub use store::{InventoryStore, OrderStore, StockDecrement, Store, Transaction};
