//! Order service: placement, status updates and queries.

use std::time::Instant;

use chrono::{SubsecRound, Utc};
use common::{Order, OrderId, OrderStatus};
use order_store::{OrderQuery, StockDecrement, Store};

use crate::error::{OrderError, Result};

use super::placement::{self, PlaceOrder, StockSnapshot};
use super::{ListOrders, OrderPage, TransitionPolicy};

/// Default upper bound for a page of orders.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Tunables for [`OrderService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderServiceConfig {
    pub transition_policy: TransitionPolicy,
    /// Larger page sizes are clamped to this value.
    pub max_page_size: u32,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Service for managing orders.
///
/// Every operation runs in its own store transaction. A transaction that is
/// not committed is rolled back when it goes out of scope, so an early
/// return through `?` never leaves partial writes behind.
pub struct OrderService<S: Store> {
    store: S,
    config: OrderServiceConfig,
}

impl<S: Store> OrderService<S> {
    /// Creates a service with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, OrderServiceConfig::default())
    }

    pub fn with_config(store: S, config: OrderServiceConfig) -> Self {
        Self { store, config }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &OrderServiceConfig {
        &self.config
    }

    /// Places a new order, reserving stock for every line.
    ///
    /// Either the order is inserted and every product's stock is decremented,
    /// or nothing changes.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id, lines = request.lines.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_place_order(request).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    items = order.items().len(),
                    total = %order.total_amount(),
                    "order placed"
                );
            }
            Err(OrderError::Storage(e)) => {
                metrics::counter!("orders_rejected_total", "reason" => "storage").increment(1);
                tracing::error!(error = %e, "order placement failed");
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                tracing::warn!(error = %e, "order rejected");
            }
        }

        result
    }

    async fn try_place_order(&self, request: PlaceOrder) -> Result<Order> {
        request.validate()?;
        let demand = request.demand()?;
        let product_ids: Vec<_> = demand.iter().map(|(id, _)| *id).collect();

        let mut tx = self.store.begin().await?;

        let snapshot: StockSnapshot = tx
            .get_products_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let missing = placement::missing_products(&demand, &snapshot);
        if !missing.is_empty() {
            return Err(OrderError::ProductNotFound {
                product_ids: missing,
            });
        }
        placement::check_stock(&demand, &snapshot)?;

        // Truncated to the precision the database keeps.
        let created_at = Utc::now().trunc_subsecs(6);
        let order = placement::price_order(request, &snapshot, OrderId::new(), created_at)?;

        // Rows are locked in id order so concurrent placements cannot deadlock.
        let mut decrements = demand;
        decrements.sort_by_key(|(product_id, _)| *product_id);

        for (product_id, requested) in decrements {
            match tx.decrement_stock(product_id, requested).await? {
                StockDecrement::Applied { remaining } => {
                    tracing::debug!(%product_id, requested, remaining, "stock reserved");
                }
                StockDecrement::Insufficient { available } => {
                    return Err(OrderError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    });
                }
                StockDecrement::Missing => {
                    return Err(OrderError::ProductNotFound {
                        product_ids: vec![product_id],
                    });
                }
            }
        }

        tx.insert_order(&order).await?;
        tx.commit().await?;

        Ok(order)
    }

    /// Loads an order with its items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let order = tx.get_order(order_id).await?;
        tx.rollback().await?;
        order.ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Changes the status of an order.
    ///
    /// `new_status` must name one of the known statuses exactly. The
    /// configured [`TransitionPolicy`] decides whether the change is allowed.
    /// The order stays locked from the check until commit, so concurrent
    /// updates are validated one after the other.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: OrderId, new_status: &str) -> Result<Order> {
        let mut tx = self.store.begin().await?;

        let current = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let status: OrderStatus = new_status
            .parse()
            .map_err(|e: common::UnknownStatus| OrderError::InvalidStatus(e.0))?;

        let from = current.status();
        self.config.transition_policy.check(from, status)?;

        let updated = tx
            .update_status(order_id, status)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        tx.commit().await?;

        metrics::counter!("order_status_updates_total", "status" => status.as_str()).increment(1);
        tracing::info!(%order_id, %from, to = %status, "order status updated");

        Ok(updated)
    }

    /// Returns one page of orders matching the filters.
    ///
    /// An unknown status name matches nothing. Pages past the end are empty.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, request: ListOrders) -> Result<OrderPage> {
        if request.page_number == 0 {
            return Err(OrderError::InvalidRequest(
                "page_number must be at least 1".to_string(),
            ));
        }
        if request.page_size == 0 {
            return Err(OrderError::InvalidRequest(
                "page_size must be at least 1".to_string(),
            ));
        }
        let page_size = request.page_size.min(self.config.max_page_size);

        let status = match request.status.as_deref() {
            None | Some("") => None,
            Some(name) => match name.parse::<OrderStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    tracing::debug!(status = name, "unknown status filter");
                    return Ok(OrderPage::empty(request.page_number, page_size));
                }
            },
        };

        let offset = u64::from(request.page_number - 1) * u64::from(page_size);
        let mut query = OrderQuery::new()
            .offset(usize::try_from(offset).unwrap_or(usize::MAX))
            .limit(page_size as usize);
        query.status = status;
        query.customer_id = request.customer_id;

        let mut tx = self.store.begin().await?;
        let orders = tx.query_orders(&query).await?;
        let total_count = tx.count_orders(&query).await?;
        tx.rollback().await?;

        tracing::debug!(returned = orders.len(), total_count, "orders listed");

        Ok(OrderPage {
            orders,
            page_number: request.page_number,
            page_size,
            total_count,
        })
    }
}
