use common::{CustomerId, OrderStatus};

/// Filter and window for scanning orders.
///
/// Filters compose with AND. Matching orders are sorted by creation time,
/// then by id, before `offset` and `limit` apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Only orders in this status.
    pub status: Option<OrderStatus>,

    /// Only orders for this customer.
    pub customer_id: Option<CustomerId>,

    /// Number of matching orders to skip.
    pub offset: usize,

    /// Maximum number of orders to return. `None` returns all remaining.
    pub limit: Option<usize>,
}

impl OrderQuery {
    /// Creates a query matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific customer.
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by customer.
    pub fn customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Skips the first `offset` matching orders.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns at most `limit` orders.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the order passes both filters.
    pub fn matches(&self, order: &common::Order) -> bool {
        if let Some(status) = self.status
            && order.status() != status
        {
            return false;
        }
        if let Some(customer_id) = self.customer_id
            && order.customer_id() != customer_id
        {
            return false;
        }
        true
    }
}
