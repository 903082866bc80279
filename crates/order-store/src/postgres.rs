use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    CustomerId, Money, Order, OrderDetails, OrderId, OrderItem, OrderItemId, OrderStatus, Product,
    ProductId,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderQuery, Result, StoreError,
    store::{InventoryStore, OrderStore, StockDecrement, Store, Transaction},
};

const PRODUCT_COLUMNS: &str =
    "id, sku, internal_code, name, description, unit_price, stock_quantity";

const ORDER_COLUMNS: &str = "id, customer_id, created_at, status, total_amount, shipping_address, billing_address, notes";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// Transaction over a [`PostgresStore`].
///
/// Wraps a sqlx transaction, which rolls back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn to_db_int(field: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange {
        field,
        value: u64::from(value),
    })
}

fn from_db_int(field: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("negative {field}: {value}")))
}

fn row_to_product(row: PgRow) -> Result<Product> {
    let stock: i32 = row.try_get("stock_quantity")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        sku: row.try_get("sku")?,
        internal_code: row.try_get("internal_code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
        stock_quantity: from_db_int("stock_quantity", stock)?,
    })
}

fn row_to_item(row: &PgRow) -> Result<OrderItem> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderItem::new(
        OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        from_db_int("quantity", quantity)?,
        Money::new(row.try_get::<Decimal, _>("unit_price")?),
    ))
}

fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status: OrderStatus = status
        .parse()
        .map_err(|e| StoreError::InvalidRow(format!("{e}")))?;

    let details = OrderDetails {
        customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
        shipping_address: row.try_get("shipping_address")?,
        billing_address: row.try_get("billing_address")?,
        notes: row.try_get("notes")?,
    };

    Ok(Order::restore(
        OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        details,
        row.try_get("created_at")?,
        status,
        items,
    ))
}

/// Appends the WHERE clause for the filters of `query` and returns the
/// number of placeholders used.
fn push_filters(sql: &mut String, query: &OrderQuery) -> usize {
    let mut param_count = 0;
    sql.push_str(" WHERE 1=1");
    if query.status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND status = ${param_count}"));
    }
    if query.customer_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND customer_id = ${param_count}"));
    }
    param_count
}

impl PostgresTransaction {
    /// Loads the items of several orders, grouped by order id in line order.
    async fn load_items(&mut self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let item = row_to_item(row)?;
            grouped
                .entry(item.order_id().as_uuid())
                .or_default()
                .push(item);
        }
        Ok(grouped)
    }

    async fn rows_to_orders(&mut self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.load_items(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| row_to_order(row, items.remove(&id).unwrap_or_default()))
            .collect()
    }

    /// Loads one order; `lock` is appended to the `SELECT`.
    async fn fetch_order(&mut self, order_id: OrderId, lock: &str) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(self.rows_to_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresTransaction {
    async fn get_products_by_ids(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        amount: u32,
    ) -> Result<StockDecrement> {
        let amount = to_db_int("quantity", amount)?;

        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2
            WHERE id = $1 AND stock_quantity >= $2
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(StockDecrement::Applied {
                remaining: from_db_int("stock_quantity", remaining)?,
            });
        }

        let available: Option<i32> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        match available {
            Some(available) => {
                tracing::debug!(%product_id, available, "conditional stock decrement refused");
                Ok(StockDecrement::Insufficient {
                    available: from_db_int("stock_quantity", available)?,
                })
            }
            None => Ok(StockDecrement::Missing),
        }
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, internal_code, name, description, unit_price, stock_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.internal_code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price.amount())
        .bind(to_db_int("stock_quantity", product.stock_quantity)?)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("unique_product_sku") => {
                        return StoreError::DuplicateKey {
                            entity: "product sku",
                            key: product.sku.clone(),
                        };
                    }
                    Some("products_pkey") => {
                        return StoreError::DuplicateKey {
                            entity: "product",
                            key: product.id.to_string(),
                        };
                    }
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku ASC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, created_at, status, total_amount, shipping_address, billing_address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(order.created_at())
        .bind(order.status().as_str())
        .bind(order.total_amount().amount())
        .bind(order.shipping_address())
        .bind(order.billing_address())
        .bind(order.notes())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateKey {
                    entity: "order",
                    key: order.id().to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, position, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id().as_uuid())
            .bind(order.id().as_uuid())
            .bind(item.product_id().as_uuid())
            .bind(position as i32)
            .bind(to_db_int("quantity", item.quantity())?)
            .bind(item.unit_price().amount())
            .bind(item.subtotal().amount())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn get_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        self.fetch_order(order_id, "").await
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        self.fetch_order(order_id, " FOR UPDATE").await
    }

    async fn query_orders(&mut self, query: &OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders");
        let mut param_count = push_filters(&mut sql, query);

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        param_count += 1;
        sql.push_str(&format!(" OFFSET ${param_count}"));

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id.as_uuid());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        sqlx_query = sqlx_query.bind(query.offset as i64);

        let rows = sqlx_query.fetch_all(&mut *self.tx).await?;
        self.rows_to_orders(rows).await
    }

    async fn count_orders(&mut self, query: &OrderQuery) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM orders");
        push_filters(&mut sql, query);

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id.as_uuid());
        }

        let count = sqlx_query.fetch_one(&mut *self.tx).await?;
        Ok(count.max(0) as u64)
    }

    async fn update_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_order(order_id).await
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
