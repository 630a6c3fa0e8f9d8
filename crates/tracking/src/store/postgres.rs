use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, TrackingEntryId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::TrackingStore;
use crate::entry::{TrackingEntry, TrackingStatus};
use crate::error::TrackingError;

const ENTRY_COLUMNS: &str = "id, order_id, status, description, location, tracking_number, \
     carrier, estimated_delivery, actual_delivery, is_notification_sent, notification_sent_at, \
     created_by, created_at";

/// PostgreSQL-backed tracking ledger.
#[derive(Clone)]
pub struct PostgresTrackingStore {
    pool: PgPool,
}

impl PostgresTrackingStore {
    /// Creates a new PostgreSQL tracking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_entry(row: PgRow) -> Result<TrackingEntry, TrackingError> {
        let status_text: String = row.try_get("status")?;
        let status = TrackingStatus::parse(&status_text).ok_or_else(|| {
            TrackingError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
                "unknown status value in row: {status_text}"
            ))))
        })?;

        Ok(TrackingEntry {
            id: TrackingEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            tracking_number: row.try_get("tracking_number")?,
            carrier: row.try_get("carrier")?,
            estimated_delivery: row.try_get("estimated_delivery")?,
            actual_delivery: row.try_get("actual_delivery")?,
            is_notification_sent: row.try_get("is_notification_sent")?,
            notification_sent_at: row.try_get("notification_sent_at")?,
            created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl TrackingStore for PostgresTrackingStore {
    async fn append(&self, entry: TrackingEntry) -> Result<TrackingEntry, TrackingError> {
        sqlx::query(
            r#"
            INSERT INTO tracking_entries (id, order_id, status, description, location,
                tracking_number, carrier, estimated_delivery, actual_delivery,
                is_notification_sent, notification_sent_at, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.order_id.as_uuid())
        .bind(entry.status.as_str())
        .bind(&entry.description)
        .bind(&entry.location)
        .bind(&entry.tracking_number)
        .bind(&entry.carrier)
        .bind(entry.estimated_delivery)
        .bind(entry.actual_delivery)
        .bind(entry.is_notification_sent)
        .bind(entry.notification_sent_at)
        .bind(entry.created_by.as_uuid())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn mark_notification_sent(
        &self,
        id: TrackingEntryId,
        at: DateTime<Utc>,
    ) -> Result<(), TrackingError> {
        sqlx::query(
            "UPDATE tracking_entries SET is_notification_sent = TRUE, notification_sent_at = $2 \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<TrackingEntry>, TrackingError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM tracking_entries WHERE order_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn latest_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<TrackingEntry>, TrackingError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM tracking_entries WHERE order_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_entry).transpose()
    }

    async fn count_orders_by_status(
        &self,
    ) -> Result<Vec<(TrackingStatus, u64)>, TrackingError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(DISTINCT order_id) AS orders FROM tracking_entries \
             GROUP BY status ORDER BY status ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let status_text: String = row.try_get("status")?;
            let Some(status) = TrackingStatus::parse(&status_text) else {
                continue;
            };
            let orders: i64 = row.try_get("orders")?;
            counts.push((status, orders as u64));
        }
        Ok(counts)
    }
}
