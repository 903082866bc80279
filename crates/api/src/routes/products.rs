//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::{Product, ProductId};
use order_store::Store;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub sku: String,
    pub internal_code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: String,
    pub stock_quantity: u32,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            sku: product.sku.clone(),
            internal_code: product.internal_code.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            unit_price: product.unit_price.to_string(),
            stock_quantity: product.stock_quantity,
        }
    }
}

#[derive(Serialize)]
pub struct SeedResponse {
    pub message: &'static str,
    pub products: Vec<ProductResponse>,
}

/// GET /products: every product with its current price and stock.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// POST /seed: insert the demo products into an empty catalog.
#[tracing::instrument(skip(state))]
pub async fn seed<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SeedResponse>, ApiError> {
    let products = state.catalog.seed_demo_products().await?;
    Ok(Json(SeedResponse {
        message: "Products seeded",
        products: products.iter().map(ProductResponse::from).collect(),
    }))
}
