//! Order placement request, validation and pricing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CustomerId, Order, OrderDetails, OrderId, OrderItem, OrderItemId, Product, ProductId};

use crate::error::{OrderError, Result};

/// One requested line: a product and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Request to place a new order.
///
/// There is no price on a line: unit prices always come from the product
/// snapshot read inside the placement transaction.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub shipping_address: String,
    pub billing_address: String,
    pub notes: Option<String>,
    pub lines: Vec<LineRequest>,
}

impl PlaceOrder {
    /// Creates a request with no lines.
    pub fn new(
        customer_id: CustomerId,
        shipping_address: impl Into<String>,
        billing_address: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            shipping_address: shipping_address.into(),
            billing_address: billing_address.into(),
            notes: None,
            lines: Vec::new(),
        }
    }

    /// Adds a line.
    pub fn line(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.lines.push(LineRequest::new(product_id, quantity));
        self
    }

    /// Sets the free-form notes.
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the request shape. Runs before any store access.
    pub fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(OrderError::InvalidRequest(
                "order must contain at least one line".to_string(),
            ));
        }
        if let Some(line) = self.lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidRequest(format!(
                "quantity for product {} must be a positive integer",
                line.product_id
            )));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(OrderError::InvalidRequest(
                "shipping address is required".to_string(),
            ));
        }
        if self.billing_address.trim().is_empty() {
            return Err(OrderError::InvalidRequest(
                "billing address is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Total units requested per product, in first-seen order.
    ///
    /// Several lines may name the same product; their quantities are summed
    /// so stock is checked and decremented once per product.
    pub fn demand(&self) -> Result<Vec<(ProductId, u32)>> {
        let mut demand: Vec<(ProductId, u32)> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            match demand.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, total)) => {
                    *total = total.checked_add(line.quantity).ok_or_else(|| {
                        OrderError::InvalidRequest(format!(
                            "total quantity for product {} is too large",
                            line.product_id
                        ))
                    })?;
                }
                None => demand.push((line.product_id, line.quantity)),
            }
        }
        Ok(demand)
    }
}

/// Products read once at the start of a placement, keyed by id.
pub type StockSnapshot = HashMap<ProductId, Product>;

/// Returns the requested ids that are absent from the snapshot.
pub fn missing_products(demand: &[(ProductId, u32)], snapshot: &StockSnapshot) -> Vec<ProductId> {
    demand
        .iter()
        .map(|(id, _)| *id)
        .filter(|id| !snapshot.contains_key(id))
        .collect()
}

/// Checks every product's demand against the snapshot.
///
/// Fails on the first product, in request order, whose stock is short.
pub fn check_stock(demand: &[(ProductId, u32)], snapshot: &StockSnapshot) -> Result<()> {
    for (product_id, requested) in demand {
        let available = snapshot
            .get(product_id)
            .map(|p| p.stock_quantity)
            .unwrap_or(0);
        if available < *requested {
            return Err(OrderError::InsufficientStock {
                product_id: *product_id,
                requested: *requested,
                available,
            });
        }
    }
    Ok(())
}

/// Builds the order, one item per line, priced from the snapshot.
///
/// Every line's product must be in the snapshot.
pub fn price_order(
    request: PlaceOrder,
    snapshot: &StockSnapshot,
    order_id: OrderId,
    created_at: DateTime<Utc>,
) -> Result<Order> {
    let items = request
        .lines
        .iter()
        .map(|line| {
            let product = snapshot
                .get(&line.product_id)
                .ok_or_else(|| OrderError::ProductNotFound {
                    product_ids: vec![line.product_id],
                })?;
            Ok(OrderItem::new(
                OrderItemId::new(),
                order_id,
                product.id,
                line.quantity,
                product.unit_price,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let details = OrderDetails {
        customer_id: request.customer_id,
        shipping_address: request.shipping_address,
        billing_address: request.billing_address,
        notes: request.notes,
    };

    Ok(Order::place(order_id, details, created_at, items))
}
