use async_trait::async_trait;
use common::{OrderId, UserId, VendorId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{OrderRepository, RepositoryError};
use crate::order::{Money, Order, OrderAmounts, OrderNumber, OrderStatus, PaymentStatus};

const ORDER_COLUMNS: &str = "id, order_number, user_id, vendor_id, items, subtotal_cents, \
     tax_cents, shipping_cents, discount_cents, total_cents, status, payment_status, \
     shipping_address, confirmed_at, shipped_at, delivered_at, cancelled_at, refunded_at, \
     return_requested, return_reason, return_requested_at, escalated, escalation_reason, \
     escalated_at, vendor_notes, admin_notes, created_by, updated_by, created_at, updated_at";

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn corrupt(field: &str, value: &str) -> RepositoryError {
        RepositoryError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
            "unknown {field} value in row: {value}"
        ))))
    }

    fn row_to_order(row: PgRow) -> Result<Order, RepositoryError> {
        let status_text: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_text)
            .ok_or_else(|| Self::corrupt("status", &status_text))?;

        let payment_text: String = row.try_get("payment_status")?;
        let payment_status = PaymentStatus::parse(&payment_text)
            .ok_or_else(|| Self::corrupt("payment_status", &payment_text))?;

        let items_json: serde_json::Value = row.try_get("items")?;
        let address_json: serde_json::Value = row.try_get("shipping_address")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::from(row.try_get::<String, _>("order_number")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            vendor_id: row
                .try_get::<Option<Uuid>, _>("vendor_id")?
                .map(VendorId::from_uuid),
            items: serde_json::from_value(items_json)?,
            amounts: OrderAmounts {
                subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
                tax_amount: Money::from_cents(row.try_get("tax_cents")?),
                shipping_amount: Money::from_cents(row.try_get("shipping_cents")?),
                discount_amount: Money::from_cents(row.try_get("discount_cents")?),
                total_amount: Money::from_cents(row.try_get("total_cents")?),
            },
            status,
            payment_status,
            shipping_address: serde_json::from_value(address_json)?,
            confirmed_at: row.try_get("confirmed_at")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            refunded_at: row.try_get("refunded_at")?,
            return_requested: row.try_get("return_requested")?,
            return_reason: row.try_get("return_reason")?,
            return_requested_at: row.try_get("return_requested_at")?,
            escalated: row.try_get("escalated")?,
            escalation_reason: row.try_get("escalation_reason")?,
            escalated_at: row.try_get("escalated_at")?,
            vendor_notes: row.try_get("vendor_notes")?,
            admin_notes: row.try_get("admin_notes")?,
            created_by: UserId::from_uuid(row.try_get::<Uuid, _>("created_by")?),
            updated_by: row
                .try_get::<Option<Uuid>, _>("updated_by")?
                .map(UserId::from_uuid),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        let items = serde_json::to_value(&order.items)?;
        let address = serde_json::to_value(&order.shipping_address)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, vendor_id, items, subtotal_cents,
                tax_cents, shipping_cents, discount_cents, total_cents, status, payment_status,
                shipping_address, confirmed_at, shipped_at, delivered_at, cancelled_at,
                refunded_at, return_requested, return_reason, return_requested_at, escalated,
                escalation_reason, escalated_at, vendor_notes, admin_notes, created_by,
                updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.user_id.as_uuid())
        .bind(order.vendor_id.map(|v| v.as_uuid()))
        .bind(&items)
        .bind(order.amounts.subtotal.cents())
        .bind(order.amounts.tax_amount.cents())
        .bind(order.amounts.shipping_amount.cents())
        .bind(order.amounts.discount_amount.cents())
        .bind(order.amounts.total_amount.cents())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&address)
        .bind(order.confirmed_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(order.refunded_at)
        .bind(order.return_requested)
        .bind(&order.return_reason)
        .bind(order.return_requested_at)
        .bind(order.escalated)
        .bind(&order.escalation_reason)
        .bind(order.escalated_at)
        .bind(&order.vendor_notes)
        .bind(&order.admin_notes)
        .bind(order.created_by.as_uuid())
        .bind(order.updated_by.map(|u| u.as_uuid()))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_order_number_key")
            {
                return RepositoryError::DuplicateOrderNumber(
                    order.order_number.as_str().to_string(),
                );
            }
            RepositoryError::Database(e)
        })?;

        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update(&self, order: Order) -> Result<Order, RepositoryError> {
        let items = serde_json::to_value(&order.items)?;
        let address = serde_json::to_value(&order.shipping_address)?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                items = $2, subtotal_cents = $3, tax_cents = $4, shipping_cents = $5,
                discount_cents = $6, total_cents = $7, status = $8, payment_status = $9,
                shipping_address = $10, confirmed_at = $11, shipped_at = $12,
                delivered_at = $13, cancelled_at = $14, refunded_at = $15,
                return_requested = $16, return_reason = $17, return_requested_at = $18,
                escalated = $19, escalation_reason = $20, escalated_at = $21,
                vendor_notes = $22, admin_notes = $23, updated_by = $24, updated_at = $25
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&items)
        .bind(order.amounts.subtotal.cents())
        .bind(order.amounts.tax_amount.cents())
        .bind(order.amounts.shipping_amount.cents())
        .bind(order.amounts.discount_amount.cents())
        .bind(order.amounts.total_amount.cents())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&address)
        .bind(order.confirmed_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(order.refunded_at)
        .bind(order.return_requested)
        .bind(&order.return_reason)
        .bind(order.return_requested_at)
        .bind(order.escalated)
        .bind(&order.escalation_reason)
        .bind(order.escalated_at)
        .bind(&order.vendor_notes)
        .bind(&order.admin_notes)
        .bind(order.updated_by.map(|u| u.as_uuid()))
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(order.id));
        }

        Ok(order)
    }

    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }

        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE vendor_id = $1 ORDER BY created_at DESC"
        ))
        .bind(vendor_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}
