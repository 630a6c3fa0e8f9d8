//! Tracking ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};
use tracking::{NewTrackingEvent, TrackingEntry, TrackingHistory, TrackingStats, TrackingStatus};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTrackingRequest {
    pub order_id: Uuid,
    pub status: TrackingStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

#[derive(Deserialize)]
pub struct ShipRequest {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

#[derive(Deserialize)]
pub struct DeliverRequest {
    pub created_by: Uuid,
}

#[derive(Deserialize)]
pub struct CancelTrackingRequest {
    pub reason: String,
    pub created_by: Uuid,
}

// -- Response types --

/// A recorded event plus the order status it reconciled to.
#[derive(Serialize)]
pub struct TrackingEventResponse {
    pub entry: TrackingEntry,
    pub order_status: OrderStatus,
}

// -- Handlers --

/// POST /order-tracking — record a tracking event and reconcile the
/// order's status.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTrackingRequest>,
) -> Result<(StatusCode, Json<TrackingEventResponse>), ApiError> {
    let (entry, order) = state
        .tracking
        .update_order_status(NewTrackingEvent {
            order_id: OrderId::from_uuid(req.order_id),
            status: req.status,
            description: req.description,
            location: req.location,
            tracking_number: req.tracking_number,
            carrier: req.carrier,
            estimated_delivery: req.estimated_delivery,
            actual_delivery: None,
            created_by: UserId::from_uuid(req.created_by),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TrackingEventResponse {
            entry,
            order_status: order.status,
        }),
    ))
}

/// PUT /order-tracking/{order_id}/ship
#[tracing::instrument(skip(state, req))]
pub async fn ship(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ShipRequest>,
) -> Result<Json<TrackingEventResponse>, ApiError> {
    let (entry, order) = state
        .tracking
        .mark_shipped(
            OrderId::from_uuid(order_id),
            req.tracking_number,
            req.carrier,
            req.estimated_delivery,
            UserId::from_uuid(req.created_by),
        )
        .await?;

    Ok(Json(TrackingEventResponse {
        entry,
        order_status: order.status,
    }))
}

/// PUT /order-tracking/{order_id}/deliver
#[tracing::instrument(skip(state, req))]
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<DeliverRequest>,
) -> Result<Json<TrackingEventResponse>, ApiError> {
    let (entry, order) = state
        .tracking
        .mark_delivered(
            OrderId::from_uuid(order_id),
            UserId::from_uuid(req.created_by),
        )
        .await?;

    Ok(Json(TrackingEventResponse {
        entry,
        order_status: order.status,
    }))
}

/// PUT /order-tracking/{order_id}/cancel
#[tracing::instrument(skip(state, req))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CancelTrackingRequest>,
) -> Result<Json<TrackingEventResponse>, ApiError> {
    let (entry, order) = state
        .tracking
        .cancel_order(
            OrderId::from_uuid(order_id),
            req.reason,
            UserId::from_uuid(req.created_by),
        )
        .await?;

    Ok(Json(TrackingEventResponse {
        entry,
        order_status: order.status,
    }))
}

/// GET /order-tracking/{order_id}/history — full ledger, oldest first.
#[tracing::instrument(skip(state))]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TrackingHistory>, ApiError> {
    Ok(Json(
        state.tracking.history(OrderId::from_uuid(order_id)).await?,
    ))
}

/// GET /order-tracking/{order_id}/latest — most recent entry.
#[tracing::instrument(skip(state))]
pub async fn latest(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TrackingEntry>, ApiError> {
    Ok(Json(
        state.tracking.latest(OrderId::from_uuid(order_id)).await?,
    ))
}

/// GET /order-tracking/stats
#[tracing::instrument(skip(state))]
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<TrackingStats>, ApiError> {
    Ok(Json(state.tracking.stats().await?))
}
