//! Domain error types.

use common::{OrderId, OrderStatus, ProductId};
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur during order operations.
///
/// Every variant except `Storage` is detected before anything is written.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request is malformed or empty.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// One or more referenced products do not exist.
    #[error("Products not found: {}", join_ids(.product_ids))]
    ProductNotFound { product_ids: Vec<ProductId> },

    /// The requested quantity exceeds the available stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// No order with this id exists.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The target status is not one of the known statuses.
    #[error("Invalid order status: {0:?}")]
    InvalidStatus(String),

    /// The configured transition policy forbids this status change.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Demo products can only be seeded into an empty catalog.
    #[error("Products already exist")]
    CatalogAlreadySeeded,

    /// The store or its transaction failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl OrderError {
    /// Units missing to satisfy an `InsufficientStock` request.
    pub fn shortfall(&self) -> Option<u32> {
        match self {
            OrderError::InsufficientStock {
                requested,
                available,
                ..
            } => Some(requested.saturating_sub(*available)),
            _ => None,
        }
    }

    /// Short, stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest(_) => "invalid_request",
            OrderError::ProductNotFound { .. } => "product_not_found",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::OrderNotFound(_) => "order_not_found",
            OrderError::InvalidStatus(_) => "invalid_status",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::CatalogAlreadySeeded => "catalog_already_seeded",
            OrderError::Storage(_) => "storage",
        }
    }
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ProductId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for order operations.
pub type Result<T> = std::result::Result<T, OrderError>;
