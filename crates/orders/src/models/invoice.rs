//! Staff-facing invoice projection.
//!
//! Invoices are a read-time view over orders, one record per order. They are
//! never stored separately - a second source of truth would drift from the
//! orders it mirrors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use little_sprout_core::{OrderId, UserId};

use super::order::Order;

/// One invoice line for staff reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Same as the order id; the projection is 1:1.
    pub invoice_id: OrderId,
    pub order_id: OrderId,
    pub owner_id: UserId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for Invoice {
    fn from(order: &Order) -> Self {
        Self {
            invoice_id: order.id,
            order_id: order.id,
            owner_id: order.owner_id,
            amount: order.total_price,
            created_at: order.created_at,
        }
    }
}
