use common::{CustomerId, Order};
use serde::Serialize;

/// Request for one page of orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOrders {
    /// Exact status name. `None` or an empty string means no filter.
    pub status: Option<String>,
    pub customer_id: Option<CustomerId>,
    /// 1-based page index.
    pub page_number: u32,
    pub page_size: u32,
}

impl ListOrders {
    /// First page of every order.
    pub fn new(page_size: u32) -> Self {
        Self {
            status: None,
            customer_id: None,
            page_number: 1,
            page_size,
        }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn page(mut self, page_number: u32) -> Self {
        self.page_number = page_number;
        self
    }
}

/// One page of orders plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page_number: u32,
    /// Effective page size after clamping.
    pub page_size: u32,
    pub total_count: u64,
}

impl OrderPage {
    pub fn empty(page_number: u32, page_size: u32) -> Self {
        Self {
            orders: Vec::new(),
            page_number,
            page_size,
            total_count: 0,
        }
    }

    /// Number of pages needed to hold every match.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let mut page = OrderPage::empty(1, 10);
        assert_eq!(page.total_pages(), 0);
        page.total_count = 21;
        assert_eq!(page.total_pages(), 3);
        page.total_count = 20;
        assert_eq!(page.total_pages(), 2);
    }
}
