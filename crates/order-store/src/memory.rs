use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Order, OrderId, OrderStatus, Product, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    OrderQuery, Result, StoreError,
    store::{InventoryStore, OrderStore, StockDecrement, Store, Transaction},
};

#[derive(Debug, Default)]
struct InMemoryState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    fail_decrement_for: Option<ProductId>,
}

impl InMemoryState {
    fn sorted_matches(&self, query: &OrderQuery) -> Vec<&Order> {
        let mut orders: Vec<_> = self.orders.values().filter(|o| query.matches(o)).collect();
        orders.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then(a.id().cmp(&b.id()))
        });
        orders
    }
}

/// In-memory store implementation for tests and local runs.
///
/// Transactions are serialized: `begin` takes an exclusive lock for the
/// lifetime of the transaction. Writes are applied in place and recorded in
/// an undo log, which is replayed if the transaction ends without commit.
/// Opening a transaction costs nothing proportional to the stored data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given products.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let state = InMemoryState {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Returns the committed state of a product.
    pub async fn product(&self, product_id: ProductId) -> Option<Product> {
        self.state.lock().await.products.get(&product_id).cloned()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Inserts an order directly, bypassing placement. Used to set up fixtures.
    pub async fn put_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id(), order);
    }

    /// Makes every decrement of `product_id` report insufficient stock,
    /// whatever the current stock is. Pass `None` to clear.
    pub async fn set_fail_decrement_for(&self, product_id: Option<ProductId>) {
        self.state.lock().await.fail_decrement_for = product_id;
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let state = self.state.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            state,
            undo: Vec::new(),
            committed: false,
        }))
    }
}

/// Previous value of an entry touched by a transaction.
enum Undo {
    Product(ProductId, Option<Product>),
    Order(OrderId, Option<Order>),
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<InMemoryState>,
    undo: Vec<Undo>,
    committed: bool,
}

impl InMemoryTransaction {
    fn remember_product(&mut self, product_id: ProductId) {
        let previous = self.state.products.get(&product_id).cloned();
        self.undo.push(Undo::Product(product_id, previous));
    }

    fn remember_order(&mut self, order_id: OrderId) {
        let previous = self.state.orders.get(&order_id).cloned();
        self.undo.push(Undo::Order(order_id, previous));
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Product(id, Some(product)) => {
                    self.state.products.insert(id, product);
                }
                Undo::Product(id, None) => {
                    self.state.products.remove(&id);
                }
                Undo::Order(id, Some(order)) => {
                    self.state.orders.insert(id, order);
                }
                Undo::Order(id, None) => {
                    self.state.orders.remove(&id);
                }
            }
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryTransaction {
    async fn get_products_by_ids(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.state.products.get(id).cloned())
            .collect())
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        amount: u32,
    ) -> Result<StockDecrement> {
        let fail = self.state.fail_decrement_for == Some(product_id);
        let Some(available) = self.state.products.get(&product_id).map(|p| p.stock_quantity)
        else {
            return Ok(StockDecrement::Missing);
        };

        if fail || available < amount {
            return Ok(StockDecrement::Insufficient { available });
        }

        self.remember_product(product_id);
        let remaining = available - amount;
        if let Some(product) = self.state.products.get_mut(&product_id) {
            product.stock_quantity = remaining;
        }
        Ok(StockDecrement::Applied { remaining })
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        if self.state.products.contains_key(&product.id) {
            return Err(StoreError::DuplicateKey {
                entity: "product",
                key: product.id.to_string(),
            });
        }
        if self.state.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::DuplicateKey {
                entity: "product sku",
                key: product.sku.clone(),
            });
        }
        self.remember_product(product.id);
        self.state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let mut products: Vec<_> = self.state.products.values().cloned().collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(products)
    }
}

#[async_trait]
impl OrderStore for InMemoryTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.state.orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateKey {
                entity: "order",
                key: order.id().to_string(),
            });
        }
        self.remember_order(order.id());
        self.state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.orders.get(&order_id).cloned())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        // The whole store is already held by this transaction.
        self.get_order(order_id).await
    }

    async fn query_orders(&mut self, query: &OrderQuery) -> Result<Vec<Order>> {
        let matches = self.state.sorted_matches(query);
        let window = matches.into_iter().skip(query.offset);
        let orders = match query.limit {
            Some(limit) => window.take(limit).cloned().collect(),
            None => window.cloned().collect(),
        };
        Ok(orders)
    }

    async fn count_orders(&mut self, query: &OrderQuery) -> Result<u64> {
        Ok(self.state.orders.values().filter(|o| query.matches(o)).count() as u64)
    }

    async fn update_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        if !self.state.orders.contains_key(&order_id) {
            return Ok(None);
        }
        self.remember_order(order_id);
        Ok(self.state.orders.get_mut(&order_id).map(|order| {
            order.set_status(status);
            order.clone()
        }))
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.committed = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
