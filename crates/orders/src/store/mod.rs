//! Order persistence.
//!
//! The store serializes concurrent mutations per order id via optimistic
//! versioning: every [`OrderStore::update`] is a compare-and-swap on
//! `(id, expected_version)`. Two staff clicking "confirm" at the same time
//! cannot both win - the loser gets [`StoreError::VersionConflict`] and the
//! caller decides how to surface it.
//!
//! Two implementations:
//! - [`PgOrderStore`] - `PostgreSQL`, one row per order, JSONB for the
//!   nested documents
//! - `MemoryOrderStore` - in-process map with identical CAS semantics,
//!   backing the test suites

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryOrderStore;
pub use postgres::{PgOrderStore, create_pool, run_migrations};

use async_trait::async_trait;
use thiserror::Error;

use little_sprout_core::{OrderId, UserId};

use crate::models::Order;

/// Errors from order store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The order changed under the writer; the expected version is stale.
    #[error("order was modified concurrently")]
    VersionConflict,

    /// Insert with an id that already exists.
    #[error("duplicate order id")]
    DuplicateId,
}

/// An order together with its persistence version.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub order: Order,
    pub version: i64,
}

/// Persistence seam for orders.
///
/// Authorization is enforced by callers; the store itself is policy-free.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a newly created order at version 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the id already exists.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Fetch an order with its current version.
    async fn get(&self, id: OrderId) -> Result<Option<StoredOrder>, StoreError>;

    /// List a customer's orders, newest first.
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// List all orders, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Persist a mutation if and only if the stored version still equals
    /// `expected_version`. Atomic per order: readers never observe partial
    /// field writes, and a stale writer gets [`StoreError::VersionConflict`].
    async fn update(&self, order: &Order, expected_version: i64) -> Result<(), StoreError>;

    /// Connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
