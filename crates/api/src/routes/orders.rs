//! Order placement, lookup, listing and status endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use common::{CustomerId, Order, OrderId, OrderItem, OrderItemId, ProductId};
use domain::{ListOrders, OrderError, PlaceOrder};
use order_store::Store;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the number of orders matching a listing, across all pages.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

// -- Request types --

/// Body of `POST /orders`.
///
/// Unknown fields are ignored, including a per-line `unit_price` sent by
/// older clients: prices always come from the catalog.
#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub shipping_address: String,
    pub billing_address: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub new_status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub shipping_address: String,
    pub billing_address: String,
    pub notes: Option<String>,
    pub total_amount: String,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal: String,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id(),
            product_id: item.product_id(),
            quantity: item.quantity(),
            unit_price: item.unit_price().to_string(),
            subtotal: item.subtotal().to_string(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            customer_id: order.customer_id(),
            created_at: order.created_at(),
            status: order.status().to_string(),
            shipping_address: order.shipping_address().to_string(),
            billing_address: order.billing_address().to_string(),
            notes: order.notes().map(String::from),
            total_amount: order.total_amount().to_string(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /orders: place an order, reserving stock for every line.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = body?;
    let customer_id: CustomerId = parse_id("customer_id", &req.customer_id)?;

    let mut request = PlaceOrder::new(customer_id, req.shipping_address, req.billing_address);
    request.notes = req.notes;
    for line in &req.items {
        let product_id: ProductId = parse_id("product_id", &line.product_id)?;
        let quantity = u32::try_from(line.quantity).map_err(|_| {
            ApiError::Order(OrderError::InvalidRequest(format!(
                "quantity for product {product_id} must be a positive integer"
            )))
        })?;
        request = request.line(product_id, quantity);
    }

    let order = state.order_service.place_order(request).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}: load an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id: OrderId = parse_id("order id", &id)?;
    let order = state.order_service.get_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders: one page of orders, filtered by status and customer.
///
/// The total number of matches is returned in the `X-Total-Count` header.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let customer_id = match params.customer_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_id::<CustomerId>("customer_id", raw)?),
    };

    let request = ListOrders {
        status: params.status,
        customer_id,
        page_number: params.page_number.unwrap_or(1),
        page_size: params.page_size.unwrap_or(state.default_page_size),
    };

    let page = state.order_service.list_orders(request).await?;
    let orders: Vec<OrderResponse> = page.orders.iter().map(OrderResponse::from).collect();

    Ok((
        [(TOTAL_COUNT_HEADER, page.total_count.to_string())],
        Json(orders),
    ))
}

/// PATCH /orders/{id}/status: overwrite the status of an order.
#[tracing::instrument(skip(state, body))]
pub async fn update_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) = body?;
    let order_id: OrderId = parse_id("order id", &id)?;
    let order = state
        .order_service
        .update_status(order_id, &req.new_status)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

pub(crate) fn parse_id<T>(field: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.trim()
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field} format: {e}")))
}
