//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, RepositoryError};
use inventory::InventoryError;
use tracking::TrackingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order domain error.
    Domain(DomainError),
    /// Tracking ledger error.
    Tracking(TrackingError),
    /// Stock ledger error.
    Inventory(InventoryError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Tracking(err) => tracking_error_to_response(err),
            ApiError::Inventory(err) => inventory_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::IllegalTransition { .. }
            | OrderError::AlreadyCancelled
            | OrderError::CannotCancel { .. }
            | OrderError::ReturnNotEligible { .. }
            | OrderError::ReturnAlreadyRequested
            | OrderError::AlreadyEscalated
            | OrderError::InvalidPaymentTransition { .. } => {
                (StatusCode::CONFLICT, err.to_string())
            }
            OrderError::NotOrderOwner => (StatusCode::FORBIDDEN, err.to_string()),
            OrderError::EmptyOrder
            | OrderError::InvalidQuantity { .. }
            | OrderError::NegativeAmount { .. }
            | OrderError::AmountMismatch { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        DomainError::OrderNotFound(_)
        | DomainError::UserNotFound(_)
        | DomainError::ProductNotFound(_)
        | DomainError::VendorNotFound(_)
        | DomainError::Repository(RepositoryError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        DomainError::UserInactive(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            tracing::error!(error = %err, "domain operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn tracking_error_to_response(err: TrackingError) -> (StatusCode, String) {
    match &err {
        TrackingError::OrderNotFound(_) | TrackingError::NoTrackingFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        TrackingError::Order(_) => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            tracing::error!(error = %err, "tracking operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    match &err {
        InventoryError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        InventoryError::DuplicateInventory { .. } | InventoryError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "stock operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<TrackingError> for ApiError {
    fn from(err: TrackingError) -> Self {
        ApiError::Tracking(err)
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}
