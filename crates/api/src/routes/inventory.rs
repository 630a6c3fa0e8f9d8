//! Stock ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use common::{InventoryId, ProductId, UserId, VendorId};
use inventory::{
    NewStockRecord, StockAdjustment, StockImportRow, StockMovementKind, StockRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateStockRequest {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub current_stock: u32,
    #[serde(default)]
    pub reserved_stock: u32,
    #[serde(default)]
    pub low_stock_threshold: u32,
    pub stock_notes: Option<String>,
    pub created_by: Uuid,
}

#[derive(Deserialize)]
pub struct AdjustStockRequest {
    pub quantity: u32,
    #[serde(rename = "type")]
    pub kind: StockMovementKind,
    pub reason: String,
    pub reference: Option<String>,
    pub updated_by: Uuid,
}

/// One line of the uploaded CSV. Headers: `product_id,current_stock,
/// reserved_stock,low_stock_threshold,notes` (the last three optional).
#[derive(Debug, Deserialize)]
struct CsvRow {
    product_id: Uuid,
    current_stock: u32,
    #[serde(default)]
    reserved_stock: u32,
    #[serde(default)]
    low_stock_threshold: u32,
    #[serde(default)]
    notes: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BulkImportRowFailure {
    /// Zero-based data-row index in the uploaded file.
    pub row: usize,
    pub product_id: Option<String>,
    pub reason: String,
}

#[derive(Serialize)]
pub struct BulkImportResponse {
    pub imported: Vec<StockRecord>,
    pub failures: Vec<BulkImportRowFailure>,
}

// -- Handlers --

/// POST /inventory — create a stock record for a (product, vendor) pair.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStockRequest>,
) -> Result<(StatusCode, Json<StockRecord>), ApiError> {
    let record = state
        .stock
        .create(NewStockRecord {
            product_id: ProductId::from_uuid(req.product_id),
            vendor_id: VendorId::from_uuid(req.vendor_id),
            current_stock: req.current_stock,
            reserved_stock: req.reserved_stock,
            low_stock_threshold: req.low_stock_threshold,
            stock_notes: req.stock_notes,
            created_by: UserId::from_uuid(req.created_by),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /inventory/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StockRecord>, ApiError> {
    let record = state
        .stock
        .get(InventoryId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stock record {id} not found")))?;
    Ok(Json(record))
}

/// POST /inventory/{id}/adjust-stock — IN/OUT/ADJUSTMENT mutation.
#[tracing::instrument(skip(state, req))]
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<StockRecord>, ApiError> {
    let record = state
        .stock
        .adjust(
            InventoryId::from_uuid(id),
            StockAdjustment {
                quantity: req.quantity,
                kind: req.kind,
                reason: req.reason,
                reference: req.reference,
                actor: UserId::from_uuid(req.updated_by),
            },
        )
        .await?;
    Ok(Json(record))
}

/// POST /inventory/bulk-import — multipart CSV upload, per-row results.
///
/// Expects a `file` part plus `vendor_id` and `created_by` parts; an
/// optional `notes` part becomes the default note for rows without one.
#[tracing::instrument(skip(state, multipart))]
pub async fn bulk_import(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BulkImportResponse>), ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut vendor_id: Option<Uuid> = None;
    let mut created_by: Option<Uuid> = None;
    let mut notes: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Could not read file: {e}")))?;
                file = Some(bytes.to_vec());
            }
            "vendor_id" | "created_by" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Could not read {name}: {e}")))?;
                let uuid = Uuid::parse_str(text.trim())
                    .map_err(|e| ApiError::BadRequest(format!("Invalid {name}: {e}")))?;
                if name == "vendor_id" {
                    vendor_id = Some(uuid);
                } else {
                    created_by = Some(uuid);
                }
            }
            "notes" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Could not read notes: {e}")))?;
                notes = Some(text);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("Missing file part".to_string()))?;
    let vendor_id = vendor_id
        .map(VendorId::from_uuid)
        .ok_or_else(|| ApiError::BadRequest("Missing vendor_id part".to_string()))?;
    let created_by = created_by
        .map(UserId::from_uuid)
        .ok_or_else(|| ApiError::BadRequest("Missing created_by part".to_string()))?;

    // Rows that fail to parse are reported per row; the rest import.
    let mut rows = Vec::new();
    let mut row_indexes = Vec::new();
    let mut failures = Vec::new();

    let mut reader = csv::Reader::from_reader(file.as_slice());
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        match result {
            Ok(row) => {
                rows.push(StockImportRow {
                    product_id: ProductId::from_uuid(row.product_id),
                    current_stock: row.current_stock,
                    reserved_stock: row.reserved_stock,
                    low_stock_threshold: row.low_stock_threshold,
                    stock_notes: row.notes.or_else(|| notes.clone()),
                });
                row_indexes.push(index);
            }
            Err(err) => failures.push(BulkImportRowFailure {
                row: index,
                product_id: None,
                reason: err.to_string(),
            }),
        }
    }

    let report = state.stock.bulk_import(vendor_id, rows, created_by).await;

    for failure in report.failures {
        failures.push(BulkImportRowFailure {
            row: row_indexes[failure.row],
            product_id: Some(failure.product_id.to_string()),
            reason: failure.reason,
        });
    }
    failures.sort_by_key(|f| f.row);

    Ok((
        StatusCode::CREATED,
        Json(BulkImportResponse {
            imported: report.imported,
            failures,
        }),
    ))
}

/// GET /inventory/low-stock
#[tracing::instrument(skip(state))]
pub async fn list_low_stock(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StockRecord>>, ApiError> {
    Ok(Json(state.stock.list_low_stock().await?))
}

/// GET /inventory/out-of-stock
#[tracing::instrument(skip(state))]
pub async fn list_out_of_stock(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StockRecord>>, ApiError> {
    Ok(Json(state.stock.list_out_of_stock().await?))
}

/// GET /inventory/product/{id}
#[tracing::instrument(skip(state))]
pub async fn list_for_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StockRecord>>, ApiError> {
    Ok(Json(
        state
            .stock
            .list_for_product(ProductId::from_uuid(id))
            .await?,
    ))
}

/// GET /inventory/vendor/{id}
#[tracing::instrument(skip(state))]
pub async fn list_for_vendor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StockRecord>>, ApiError> {
    Ok(Json(
        state
            .stock
            .list_for_vendor(VendorId::from_uuid(id))
            .await?,
    ))
}
