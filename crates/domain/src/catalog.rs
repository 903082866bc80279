//! Product catalog: listing, adding and demo seeding.

use common::{Money, Product};
use order_store::{Store, StoreError};
use rust_decimal::Decimal;

use crate::error::{OrderError, Result};

/// The four products inserted by [`ProductCatalog::seed_demo_products`].
pub fn demo_products() -> Vec<Product> {
    [
        (
            "SKU-001",
            "PROD001",
            "Camiseta Negra",
            "Camiseta de algodón talla M",
            Decimal::new(250000, 2),
            100,
        ),
        (
            "SKU-002",
            "PROD002",
            "Zapatillas Urbanas",
            "Zapatillas deportivas unisex",
            Decimal::new(850000, 2),
            50,
        ),
        (
            "SKU-003",
            "PROD003",
            "Gorra Roja",
            "Gorra ajustable de algodón",
            Decimal::new(120000, 2),
            75,
        ),
        (
            "SKU-004",
            "PROD004",
            "Gorra Morada",
            "Gorra ajustable de lana",
            Decimal::new(120000, 2),
            75,
        ),
    ]
    .into_iter()
    .map(|(sku, code, name, description, price, stock)| {
        Product::new(sku, code, name, Money::new(price), stock).with_description(description)
    })
    .collect()
}

/// Read and seed access to the shared product inventory.
pub struct ProductCatalog<S: Store> {
    store: S,
}

impl<S: Store> ProductCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns every product, sorted by SKU.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        tx.rollback().await?;
        Ok(products)
    }

    /// Adds a single product.
    #[tracing::instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn add_product(&self, product: Product) -> Result<Product> {
        if product.unit_price.is_negative() {
            return Err(OrderError::InvalidRequest(
                "unit price must not be negative".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        match tx.insert_product(&product).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey { key, .. }) => {
                return Err(OrderError::InvalidRequest(format!(
                    "product {key} already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        tracing::info!(product_id = %product.id, "product added");
        Ok(product)
    }

    /// Inserts the demo products into an empty catalog.
    ///
    /// Fails with `CatalogAlreadySeeded` if any product already exists.
    #[tracing::instrument(skip(self))]
    pub async fn seed_demo_products(&self) -> Result<Vec<Product>> {
        let mut tx = self.store.begin().await?;

        if !tx.list_products().await?.is_empty() {
            tracing::warn!("catalog already seeded");
            return Err(OrderError::CatalogAlreadySeeded);
        }

        let products = demo_products();
        for product in &products {
            match tx.insert_product(product).await {
                Ok(()) => {}
                // A concurrent seed got there first.
                Err(StoreError::DuplicateKey { .. }) => return Err(OrderError::CatalogAlreadySeeded),
                Err(e) => return Err(e.into()),
            }
        }
        tx.commit().await?;

        tracing::info!(count = products.len(), "demo products seeded");
        Ok(products)
    }
}
