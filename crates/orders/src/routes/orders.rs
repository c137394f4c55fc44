//! Order route handlers.
//!
//! Thin JSON adapters over [`crate::fulfillment::FulfillmentService`]; all
//! policy and state machine decisions live in the service layer.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use little_sprout_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::RequirePrincipal;
use crate::models::{DeliveryPerson, Invoice, LineItem, Order, ShippingAddress};
use crate::state::AppState;

/// Body for `POST /orders`.
///
/// Note what is absent: no owner, no total. Both are server-derived.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub line_items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
}

/// Body for `PUT /orders/{id}/ship`; both fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShipRequest {
    pub delivery_person: Option<DeliveryPerson>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

/// Unwrap a JSON body, classifying malformed payloads as `InvalidInput`.
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::InvalidInput(e.body_text()))
}

/// POST /orders - create an order owned by the caller.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let request = json_body(payload)?;
    let order = state
        .fulfillment()
        .create_order(&principal, request.line_items, request.shipping_address)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/mine - the caller's own orders.
#[instrument(skip_all)]
pub async fn mine(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.fulfillment().list_mine(&principal).await?))
}

/// GET /orders - all orders, staff only.
#[instrument(skip_all)]
pub async fn list_all(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.fulfillment().list_all(&principal).await?))
}

/// GET /orders/invoices - staff reconciliation view.
#[instrument(skip_all)]
pub async fn invoices(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> Result<Json<Vec<Invoice>>> {
    Ok(Json(state.fulfillment().list_invoices(&principal).await?))
}

/// GET /orders/{id} - one order, subject to the read policy.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn get_by_id(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.fulfillment().get_order(&principal, id).await?))
}

/// PUT /orders/{id}/confirm - staff only.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.fulfillment().confirm(&principal, id).await?))
}

/// PUT /orders/{id}/pack - staff only.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn pack(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.fulfillment().pack(&principal, id).await?))
}

/// PUT /orders/{id}/ship - staff only; body may carry a delivery assignment
/// and an estimated delivery time.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn ship(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<OrderId>,
    payload: std::result::Result<Option<Json<ShipRequest>>, JsonRejection>,
) -> Result<Json<Order>> {
    let request = payload
        .map_err(|e| AppError::InvalidInput(e.body_text()))?
        .map(|Json(body)| body)
        .unwrap_or_default();

    let order = state
        .fulfillment()
        .ship(
            &principal,
            id,
            request.delivery_person,
            request.estimated_delivery_time,
        )
        .await?;
    Ok(Json(order))
}
