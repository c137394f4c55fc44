//! `PostgreSQL` order store.
//!
//! One row per order. Scalar columns (status, paid flags, total, version)
//! stay relational for querying; the nested documents (line items, address,
//! payment result, delivery details) live in JSONB, matching the shapes in
//! `crate::models`.
//!
//! Queries use runtime binding (`sqlx::query_as`) rather than the
//! compile-time macros, so the workspace builds without a live database.
//!
//! # Migrations
//!
//! Migrations live in `crates/orders/migrations/` and are embedded via
//! `sqlx::migrate!`; the binary applies them on startup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use little_sprout_core::{OrderId, OrderStatus, UserId};

use super::{OrderStore, StoreError, StoredOrder};
use crate::models::{DeliveryDetails, LineItem, Order, PaymentResult, ShippingAddress};

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

const SELECT_COLUMNS: &str = "id, owner_id, status, is_paid, paid_at, total_price, \
     line_items, shipping_address, payment_result, delivery_details, \
     estimated_delivery_time, created_at, version";

type OrderRow = (
    Uuid,                      // id
    Uuid,                      // owner_id
    String,                    // status
    bool,                      // is_paid
    Option<DateTime<Utc>>,     // paid_at
    Decimal,                   // total_price
    serde_json::Value,         // line_items
    serde_json::Value,         // shipping_address
    Option<serde_json::Value>, // payment_result
    Option<serde_json::Value>, // delivery_details
    Option<DateTime<Utc>>,     // estimated_delivery_time
    DateTime<Utc>,             // created_at
    i64,                       // version
);

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// `PostgreSQL`-backed order store.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO orders (id, owner_id, status, is_paid, paid_at, total_price, \
             line_items, shipping_address, payment_result, delivery_details, \
             estimated_delivery_time, created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0)",
        )
        .bind(order.id.as_uuid())
        .bind(order.owner_id.as_uuid())
        .bind(order.status.to_string())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.total_price)
        .bind(to_json(&order.line_items)?)
        .bind(to_json(&order.shipping_address)?)
        .bind(order.payment_result.as_ref().map(to_json).transpose()?)
        .bind(order.delivery_details.as_ref().map(to_json).transpose()?)
        .bind(order.estimated_delivery_time)
        .bind(order.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateId),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: OrderId) -> Result<Option<StoredOrder>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_stored).transpose()
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| decode_stored(row).map(|stored| stored.order))
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| decode_stored(row).map(|stored| stored.order))
            .collect()
    }

    async fn update(&self, order: &Order, expected_version: i64) -> Result<(), StoreError> {
        // Line items, address, total, owner and creation time are immutable
        // after insert; only lifecycle fields are written back. The version
        // predicate makes the write a compare-and-swap.
        let result = sqlx::query(
            "UPDATE orders SET status = $2, is_paid = $3, paid_at = $4, \
             payment_result = $5, delivery_details = $6, estimated_delivery_time = $7, \
             version = version + 1 \
             WHERE id = $1 AND version = $8",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.to_string())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.payment_result.as_ref().map(to_json).transpose()?)
        .bind(order.delivery_details.as_ref().map(to_json).transpose()?)
        .bind(order.estimated_delivery_time)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(StoreError::VersionConflict)
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Row decoding
// =============================================================================

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(sqlx::error::DatabaseError::code)
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::DataCorruption(format!("cannot encode document: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::DataCorruption(format!("invalid {what} in database: {e}")))
}

fn decode_stored(row: OrderRow) -> Result<StoredOrder, StoreError> {
    let (
        id,
        owner_id,
        status,
        is_paid,
        paid_at,
        total_price,
        line_items,
        shipping_address,
        payment_result,
        delivery_details,
        estimated_delivery_time,
        created_at,
        version,
    ) = row;

    let status: OrderStatus = status
        .parse()
        .map_err(|e: String| StoreError::DataCorruption(e))?;
    let line_items: Vec<LineItem> = from_json(line_items, "line items")?;
    let shipping_address: ShippingAddress = from_json(shipping_address, "shipping address")?;
    let payment_result: Option<PaymentResult> = payment_result
        .map(|v| from_json(v, "payment result"))
        .transpose()?;
    let delivery_details: Option<DeliveryDetails> = delivery_details
        .map(|v| from_json(v, "delivery details"))
        .transpose()?;

    Ok(StoredOrder {
        order: Order {
            id: OrderId::new(id),
            owner_id: UserId::new(owner_id),
            line_items,
            shipping_address,
            total_price,
            status,
            is_paid,
            paid_at,
            payment_result,
            delivery_details,
            estimated_delivery_time,
            created_at,
        },
        version,
    })
}
