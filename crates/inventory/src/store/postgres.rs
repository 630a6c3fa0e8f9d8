use async_trait::async_trait;
use chrono::Utc;
use common::{InventoryId, ProductId, UserId, VendorId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::StockStore;
use crate::error::InventoryError;
use crate::record::{StockAdjustment, StockRecord};

const STOCK_COLUMNS: &str = "id, product_id, vendor_id, current_stock, reserved_stock, \
     available_stock, is_out_of_stock, is_low_stock, low_stock_threshold, last_stock_update, \
     last_low_stock_alert, stock_notes, stock_history, created_by, updated_by, created_at, \
     updated_at";

/// PostgreSQL-backed stock store.
///
/// `adjust` locks the row with `SELECT ... FOR UPDATE` inside a
/// transaction, so concurrent adjustments serialize at the database.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_record(row: PgRow) -> Result<StockRecord, InventoryError> {
        let history_json: serde_json::Value = row.try_get("stock_history")?;

        Ok(StockRecord {
            id: InventoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            current_stock: row.try_get::<i32, _>("current_stock")? as u32,
            reserved_stock: row.try_get::<i32, _>("reserved_stock")? as u32,
            available_stock: row.try_get::<i32, _>("available_stock")? as u32,
            is_out_of_stock: row.try_get("is_out_of_stock")?,
            is_low_stock: row.try_get("is_low_stock")?,
            low_stock_threshold: row.try_get::<i32, _>("low_stock_threshold")? as u32,
            last_stock_update: row.try_get("last_stock_update")?,
            last_low_stock_alert: row.try_get("last_low_stock_alert")?,
            stock_notes: row.try_get("stock_notes")?,
            stock_history: serde_json::from_value(history_json)?,
            created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by")?),
            updated_by: row
                .try_get::<Option<Uuid>, _>("updated_by")?
                .map(UserId::from_uuid),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn persist<'e, E>(record: &StockRecord, executor: E) -> Result<u64, InventoryError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let history = serde_json::to_value(&record.stock_history)?;

        let result = sqlx::query(
            r#"
            UPDATE stock_records SET
                current_stock = $2, reserved_stock = $3, available_stock = $4,
                is_out_of_stock = $5, is_low_stock = $6, low_stock_threshold = $7,
                last_stock_update = $8, last_low_stock_alert = $9, stock_notes = $10,
                stock_history = $11, updated_by = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.current_stock as i32)
        .bind(record.reserved_stock as i32)
        .bind(record.available_stock as i32)
        .bind(record.is_out_of_stock)
        .bind(record.is_low_stock)
        .bind(record.low_stock_threshold as i32)
        .bind(record.last_stock_update)
        .bind(record.last_low_stock_alert)
        .bind(&record.stock_notes)
        .bind(&history)
        .bind(record.updated_by.map(|u| u.as_uuid()))
        .bind(record.updated_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    async fn insert(&self, record: StockRecord) -> Result<StockRecord, InventoryError> {
        let history = serde_json::to_value(&record.stock_history)?;

        sqlx::query(
            r#"
            INSERT INTO stock_records (id, product_id, vendor_id, current_stock, reserved_stock,
                available_stock, is_out_of_stock, is_low_stock, low_stock_threshold,
                last_stock_update, last_low_stock_alert, stock_notes, stock_history,
                created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.product_id.as_uuid())
        .bind(record.vendor_id.as_uuid())
        .bind(record.current_stock as i32)
        .bind(record.reserved_stock as i32)
        .bind(record.available_stock as i32)
        .bind(record.is_out_of_stock)
        .bind(record.is_low_stock)
        .bind(record.low_stock_threshold as i32)
        .bind(record.last_stock_update)
        .bind(record.last_low_stock_alert)
        .bind(&record.stock_notes)
        .bind(&history)
        .bind(record.created_by.as_uuid())
        .bind(record.updated_by.map(|u| u.as_uuid()))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("stock_records_product_vendor_key")
            {
                return InventoryError::DuplicateInventory {
                    product_id: record.product_id,
                    vendor_id: record.vendor_id,
                };
            }
            InventoryError::Database(e)
        })?;

        Ok(record)
    }

    async fn find(&self, id: InventoryId) -> Result<Option<StockRecord>, InventoryError> {
        let row = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_by_pair(
        &self,
        product_id: ProductId,
        vendor_id: VendorId,
    ) -> Result<Option<StockRecord>, InventoryError> {
        let row = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE product_id = $1 AND vendor_id = $2"
        ))
        .bind(product_id.as_uuid())
        .bind(vendor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn update(&self, record: StockRecord) -> Result<StockRecord, InventoryError> {
        let rows_affected = Self::persist(&record, &self.pool).await?;
        if rows_affected == 0 {
            return Err(InventoryError::NotFound(record.id));
        }
        Ok(record)
    }

    async fn adjust(
        &self,
        id: InventoryId,
        adjustment: StockAdjustment,
    ) -> Result<(StockRecord, bool), InventoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(InventoryError::NotFound(id))?;

        let mut record = Self::row_to_record(row)?;
        let crossed_into_low = record.apply(&adjustment, Utc::now())?;

        Self::persist(&record, &mut *tx).await?;
        tx.commit().await?;

        Ok((record, crossed_into_low))
    }

    async fn list_low_stock(&self) -> Result<Vec<StockRecord>, InventoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE is_low_stock ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn list_out_of_stock(&self) -> Result<Vec<StockRecord>, InventoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE is_out_of_stock ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE product_id = $1 ORDER BY created_at ASC"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn list_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<StockRecord>, InventoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_records WHERE vendor_id = $1 ORDER BY created_at ASC"
        ))
        .bind(vendor_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
