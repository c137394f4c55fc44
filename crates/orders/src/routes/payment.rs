//! Payment route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use little_sprout_core::{CurrencyCode, OrderId};

use crate::error::{AppError, Result};
use crate::middleware::RequirePrincipal;
use crate::payment::PaymentIntent;
use crate::state::AppState;

/// Body for `POST /payment/create-order`. The amount is intentionally not a
/// field here; it always comes from the stored order total.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
}

/// Body for `POST /payment/verify`, echoing the processor's callback fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyPaymentRequest {
    pub order_id: OrderId,
    pub external_order_id: String,
    pub external_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::InvalidInput(e.body_text()))
}

/// POST /payment/create-order - register the order with the processor and
/// return a client-side payment intent.
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    payload: std::result::Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<PaymentIntent>> {
    let request = json_body(payload)?;
    let currency = request.currency.unwrap_or_default();
    let intent = state
        .payment()
        .create_intent(&principal, request.order_id, currency)
        .await?;
    Ok(Json(intent))
}

/// POST /payment/verify - check the processor signature and mark the order
/// paid. Idempotent for an already-paid order.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    RequirePrincipal(_principal): RequirePrincipal,
    payload: std::result::Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>> {
    let request = json_body(payload)?;
    let order = state
        .payment()
        .verify_and_capture(
            request.order_id,
            &request.external_order_id,
            &request.external_payment_id,
            &request.signature,
        )
        .await?;
    Ok(Json(VerifyPaymentResponse {
        success: true,
        order_id: order.id,
    }))
}

/// GET /payment/key - the processor's public key id, needed by the checkout
/// widget before any authenticated call happens.
#[instrument(skip_all)]
pub async fn key(State(state): State<AppState>) -> Json<KeyResponse> {
    Json(KeyResponse {
        key: state.payment().public_key().to_owned(),
    })
}
