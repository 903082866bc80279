use async_trait::async_trait;
use common::{Order, OrderId, OrderStatus, Product, ProductId};

use crate::{OrderQuery, Result};

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was decremented; `remaining` units are left.
    Applied { remaining: u32 },

    /// Stock was lower than the requested amount and was left untouched.
    Insufficient { available: u32 },

    /// No product with that id exists.
    Missing,
}

impl StockDecrement {
    /// Returns true if the decrement was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, StockDecrement::Applied { .. })
    }
}

/// Product inventory operations available inside a transaction.
#[async_trait]
pub trait InventoryStore: Send {
    /// Reads every product whose id is in `ids` in a single batch.
    ///
    /// Unknown ids are skipped; the caller compares the result against the
    /// requested ids.
    async fn get_products_by_ids(&mut self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Decrements stock by `amount` only if at least `amount` units remain.
    ///
    /// The check and the write are one atomic step evaluated by the store.
    async fn decrement_stock(&mut self, product_id: ProductId, amount: u32)
    -> Result<StockDecrement>;

    /// Adds a new product. Fails with `DuplicateKey` if the id or SKU exists.
    async fn insert_product(&mut self, product: &Product) -> Result<()>;

    /// Returns every product, sorted by SKU.
    async fn list_products(&mut self) -> Result<Vec<Product>>;
}

/// Order operations available inside a transaction.
#[async_trait]
pub trait OrderStore: Send {
    /// Inserts an order together with all of its items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Loads an order with its items.
    async fn get_order(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads an order and holds a write lock on it until the transaction ends.
    ///
    /// A concurrent `lock_order` on the same order waits for this
    /// transaction to commit or roll back, then sees its writes.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    /// Returns the orders matching `query`, each with its items.
    async fn query_orders(&mut self, query: &OrderQuery) -> Result<Vec<Order>>;

    /// Counts the orders matching the filters of `query`, ignoring its window.
    async fn count_orders(&mut self, query: &OrderQuery) -> Result<u64>;

    /// Overwrites the status of an order and returns the updated order.
    ///
    /// Returns `None` if the order does not exist.
    async fn update_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>>;
}

/// One unit of work spanning both stores.
///
/// Nothing written through a transaction is visible to others until
/// `commit` succeeds. Dropping a transaction without committing rolls it
/// back.
#[async_trait]
pub trait Transaction: InventoryStore + OrderStore {
    /// Makes every write of this transaction durable and visible.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Handle to the durable store.
///
/// Implementations are cheap to clone and safe to share between requests.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}
