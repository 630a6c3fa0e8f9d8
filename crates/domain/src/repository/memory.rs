use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId, VendorId};
use tokio::sync::RwLock;

use super::{OrderRepository, RepositoryError};
use crate::order::Order;

/// In-memory order repository for testing and local runs.
///
/// Provides the same interface and uniqueness guarantees as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

fn sorted_newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.write().await;

        if orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(RepositoryError::DuplicateOrderNumber(
                order.order_number.as_str().to_string(),
            ));
        }

        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|order| order.order_number.as_str() == order_number)
            .cloned())
    }

    async fn update(&self, order: Order) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.write().await;

        if !orders.contains_key(&order.id) {
            return Err(RepositoryError::NotFound(order.id));
        }

        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.remove(&id).ok_or(RepositoryError::NotFound(id))?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(sorted_newest_first(
            orders
                .values()
                .filter(|order| order.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(sorted_newest_first(
            orders
                .values()
                .filter(|order| order.vendor_id == Some(vendor_id))
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(sorted_newest_first(orders.values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::ProductId;

    use crate::order::{
        LineItem, Money, OrderAmounts, OrderNumber, PaymentStatus, ShippingAddress,
    };

    fn make_order(user_id: UserId, vendor_id: Option<VendorId>) -> Order {
        let items = vec![LineItem::new(
            ProductId::new(),
            "Widget",
            1,
            Money::from_cents(1000),
            vendor_id,
        )];
        let amounts = OrderAmounts::from_parts(
            Money::from_cents(1000),
            Money::zero(),
            Money::zero(),
            Money::zero(),
        );
        Order::new(
            OrderNumber::generate(Utc::now()),
            user_id,
            vendor_id,
            items,
            amounts,
            ShippingAddress {
                recipient: "r".to_string(),
                line1: "l1".to_string(),
                line2: None,
                city: "c".to_string(),
                region: "r".to_string(),
                postal_code: "0".to_string(),
                country: "US".to_string(),
            },
            PaymentStatus::Pending,
            user_id,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_and_find() {
        let repo = InMemoryOrderRepository::new();
        let order = make_order(UserId::new(), None);
        let id = order.id;

        repo.insert(order.clone()).await.unwrap();

        let found = repo.find(id).await.unwrap().unwrap();
        assert_eq!(found.order_number, order.order_number);

        let by_number = repo
            .find_by_number(order.order_number.as_str())
            .await
            .unwrap();
        assert!(by_number.is_some());
    }

    #[tokio::test]
    async fn insert_duplicate_number_fails() {
        let repo = InMemoryOrderRepository::new();
        let order = make_order(UserId::new(), None);
        repo.insert(order.clone()).await.unwrap();

        let mut clash = make_order(UserId::new(), None);
        clash.order_number = order.order_number.clone();

        let result = repo.insert(clash).await;
        assert!(matches!(
            result,
            Err(RepositoryError::DuplicateOrderNumber(_))
        ));
        assert_eq!(repo.order_count().await, 1);
    }

    #[tokio::test]
    async fn update_missing_order_fails() {
        let repo = InMemoryOrderRepository::new();
        let order = make_order(UserId::new(), None);

        let result = repo.update(order).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_filters_by_user_and_vendor() {
        let repo = InMemoryOrderRepository::new();
        let user = UserId::new();
        let vendor = VendorId::new();

        repo.insert(make_order(user, None)).await.unwrap();
        repo.insert(make_order(user, Some(vendor))).await.unwrap();
        repo.insert(make_order(UserId::new(), None)).await.unwrap();

        assert_eq!(repo.list_for_user(user).await.unwrap().len(), 2);
        assert_eq!(repo.list_for_vendor(vendor).await.unwrap().len(), 1);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn remove_deletes_order() {
        let repo = InMemoryOrderRepository::new();
        let order = make_order(UserId::new(), None);
        let id = order.id;
        repo.insert(order).await.unwrap();

        repo.remove(id).await.unwrap();
        assert!(repo.find(id).await.unwrap().is_none());

        let result = repo.remove(id).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}
