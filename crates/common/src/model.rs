//! Product, order and order item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, Money, OrderId, OrderItemId, OrderStatus, ProductId};

/// A product in the shared inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Unique business code.
    pub sku: String,

    pub internal_code: String,

    pub name: String,

    pub description: Option<String>,

    /// Current unit price. Orders snapshot this at placement time.
    pub unit_price: Money,

    /// Units available. Only ever decremented by order placement.
    pub stock_quantity: u32,
}

impl Product {
    /// Creates a product with a fresh identifier.
    pub fn new(
        sku: impl Into<String>,
        internal_code: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        stock_quantity: u32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            sku: sku.into(),
            internal_code: internal_code.into(),
            name: name.into(),
            description: None,
            unit_price,
            stock_quantity,
        }
    }

    /// Sets the free-form description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One product-quantity-price line of an order.
///
/// Created once at placement; the subtotal is always `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
    subtotal: Money,
}

impl OrderItem {
    /// Creates an order item, computing its subtotal.
    pub fn new(
        id: OrderItemId,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            quantity,
            unit_price,
            subtotal: unit_price.multiply(quantity),
        }
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price snapshotted from the product when the order was placed.
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }
}

/// Customer-supplied order fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub customer_id: CustomerId,
    pub shipping_address: String,
    pub billing_address: String,
    pub notes: Option<String>,
}

/// An order and the items it owns.
///
/// The total is computed from the items when the order is built and no
/// method changes the items afterwards, so `total_amount` always equals the
/// sum of the item subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    details: OrderDetails,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    total_amount: Money,
    items: Vec<OrderItem>,
}

impl Order {
    /// Builds a freshly placed order in the `Pending` status.
    pub fn place(
        id: OrderId,
        details: OrderDetails,
        created_at: DateTime<Utc>,
        items: Vec<OrderItem>,
    ) -> Self {
        Self::restore(id, details, created_at, OrderStatus::Pending, items)
    }

    /// Rebuilds an order loaded from storage.
    pub fn restore(
        id: OrderId,
        details: OrderDetails,
        created_at: DateTime<Utc>,
        status: OrderStatus,
        items: Vec<OrderItem>,
    ) -> Self {
        let total_amount = items.iter().map(OrderItem::subtotal).sum();
        Self {
            id,
            details,
            created_at,
            status,
            total_amount,
            items,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.details.customer_id
    }

    pub fn shipping_address(&self) -> &str {
        &self.details.shipping_address
    }

    pub fn billing_address(&self) -> &str {
        &self.details.billing_address
    }

    pub fn notes(&self) -> Option<&str> {
        self.details.notes.as_deref()
    }

    /// Creation instant in UTC. Never changes.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Overwrites the status. Items and total are untouched.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
}
