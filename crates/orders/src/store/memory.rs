//! In-memory order store backing the test suites.
//!
//! Mirrors the Postgres store's compare-and-swap semantics exactly so
//! concurrency tests exercise the same contract the production store
//! provides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use little_sprout_core::{OrderId, UserId};

use super::{OrderStore, StoreError, StoredOrder};
use crate::models::Order;

/// Map-backed order store with versioned CAS updates.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, StoredOrder>>>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateId);
        }
        orders.insert(
            order.id,
            StoredOrder {
                order: order.clone(),
                version: 0,
            },
        );
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<StoredOrder>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|stored| stored.order.owner_id == owner_id)
            .map(|stored| stored.order.clone())
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders.values().map(|stored| stored.order.clone()).collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn update(&self, order: &Order, expected_version: i64) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or(StoreError::VersionConflict)?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict);
        }
        stored.order = order.clone();
        stored.version += 1;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::{address, item};

    fn new_order() -> Order {
        Order::create(
            UserId::generate(),
            vec![item("Teether", "120", 1)],
            address(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = MemoryOrderStore::new();
        let order = new_order();
        store.insert(&order).await.unwrap();

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.order, order);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let store = MemoryOrderStore::new();
        let order = new_order();
        store.insert(&order).await.unwrap();
        assert!(matches!(
            store.insert(&order).await,
            Err(StoreError::DuplicateId)
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = MemoryOrderStore::new();
        assert!(store.get(OrderId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        store.insert(&order).await.unwrap();

        order.is_paid = true;
        store.update(&order, 0).await.unwrap();

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert!(stored.order.is_paid);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = MemoryOrderStore::new();
        let mut order = new_order();
        store.insert(&order).await.unwrap();

        order.is_paid = true;
        store.update(&order, 0).await.unwrap();

        // Second writer still holds version 0
        assert!(matches!(
            store.update(&order, 0).await,
            Err(StoreError::VersionConflict)
        ));
    }

    #[tokio::test]
    async fn test_list_by_owner_filters_and_orders_newest_first() {
        let store = MemoryOrderStore::new();
        let owner = UserId::generate();

        let mut first = new_order();
        first.owner_id = owner;
        let mut second = new_order();
        second.owner_id = owner;
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        let other = new_order();

        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();
        store.insert(&other).await.unwrap();

        let mine = store.list_by_owner(owner).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id);
        assert_eq!(mine[1].id, first.id);

        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }
}
