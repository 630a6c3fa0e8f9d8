//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId, UserId, VendorId};
use domain::{
    Money, NewLineItem, NewOrder, Order, OrderStats, OrderStatus, PaymentOutcome, PaymentStatus,
    RefundScope, ShippingAddress, TransitionMode, UpdateStatusOptions,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price_cents: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub shipping_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    /// When present, validated against the server-computed total.
    pub total_cents: Option<i64>,
    pub shipping_address: ShippingAddress,
    pub payment_status: Option<PaymentStatus>,
    /// Defaults to `user_id`.
    pub created_by: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub vendor_notes: Option<String>,
    /// Administrative override: skip the transition guard.
    #[serde(default)]
    pub force: bool,
    pub updated_by: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub reason: String,
    pub actor_id: Uuid,
}

#[derive(Deserialize)]
pub struct ReturnRequest {
    pub reason: String,
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct EscalateRequest {
    pub reason: String,
    pub actor_id: Uuid,
}

#[derive(Deserialize)]
pub struct SettlePaymentRequest {
    pub outcome: PaymentOutcome,
}

#[derive(Deserialize)]
pub struct RefundPaymentRequest {
    pub scope: RefundScope,
}

// -- Handlers --

/// POST /orders — create a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let user_id = UserId::from_uuid(req.user_id);
    let order = state
        .orders
        .create(NewOrder {
            user_id,
            vendor_id: req.vendor_id.map(VendorId::from_uuid),
            items: req
                .items
                .into_iter()
                .map(|item| NewLineItem {
                    product_id: ProductId::from_uuid(item.product_id),
                    quantity: item.quantity,
                    unit_price: item.unit_price_cents.map(Money::from_cents),
                })
                .collect(),
            tax_amount: Money::from_cents(req.tax_cents),
            shipping_amount: Money::from_cents(req.shipping_cents),
            discount_amount: Money::from_cents(req.discount_cents),
            total_amount: req.total_cents.map(Money::from_cents),
            shipping_address: req.shipping_address,
            payment_status: req.payment_status,
            created_by: req.created_by.map(UserId::from_uuid).unwrap_or(user_id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders — every order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all().await?))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .orders
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(order))
}

/// GET /orders/user/{id} — orders for one user, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(
        state.orders.list_for_user(UserId::from_uuid(id)).await?,
    ))
}

/// GET /orders/vendor/{id} — orders for one vendor, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_vendor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(
        state
            .orders
            .list_for_vendor(VendorId::from_uuid(id))
            .await?,
    ))
}

/// PATCH /orders/{id}/status — guarded status update, or forced with
/// `"force": true`.
#[tracing::instrument(skip(state, req))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .update_status(
            OrderId::from_uuid(id),
            req.status,
            UpdateStatusOptions {
                mode: if req.force {
                    TransitionMode::Force
                } else {
                    TransitionMode::Guarded
                },
                vendor_notes: req.vendor_notes,
                updated_by: req.updated_by.map(UserId::from_uuid),
            },
        )
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state, req))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .cancel(
            OrderId::from_uuid(id),
            req.reason,
            UserId::from_uuid(req.actor_id),
        )
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/return
#[tracing::instrument(skip(state, req))]
pub async fn request_return(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReturnRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .request_return(
            OrderId::from_uuid(id),
            req.reason,
            UserId::from_uuid(req.user_id),
        )
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/escalate
#[tracing::instrument(skip(state, req))]
pub async fn escalate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<EscalateRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .escalate(
            OrderId::from_uuid(id),
            req.reason,
            UserId::from_uuid(req.actor_id),
        )
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/payment/begin
#[tracing::instrument(skip(state))]
pub async fn begin_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state.orders.begin_payment(OrderId::from_uuid(id)).await?,
    ))
}

/// POST /orders/{id}/payment/settle — idempotent settlement.
#[tracing::instrument(skip(state, req))]
pub async fn settle_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SettlePaymentRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state
            .orders
            .settle_payment(OrderId::from_uuid(id), req.outcome)
            .await?,
    ))
}

/// POST /orders/{id}/payment/refund
#[tracing::instrument(skip(state, req))]
pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RefundPaymentRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state
            .orders
            .refund_payment(OrderId::from_uuid(id), req.scope)
            .await?,
    ))
}

/// DELETE /orders/{id} — administrative hard delete.
#[tracing::instrument(skip(state))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.orders.remove(OrderId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/stats
#[tracing::instrument(skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<OrderStats>, ApiError> {
    Ok(Json(state.orders.stats().await?))
}
