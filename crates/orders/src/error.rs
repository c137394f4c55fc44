//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Every error maps to a structured JSON body:
//!
//! ```json
//! { "error": "invalid_transition", "message": "cannot ship a pending order" }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use little_sprout_core::OrderStatus;

use crate::payment::ProcessorError;
use crate::store::StoreError;

/// Application-level error type for the orders service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing required input fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No resolvable principal on the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Access policy denied the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown order id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Fulfillment state machine rule violation.
    #[error("Invalid transition: cannot {action} an order in status {from}")]
    InvalidTransition {
        from: OrderStatus,
        action: &'static str,
    },

    /// Payment callback signature mismatch. Deliberately carries no detail
    /// about which part of the payload failed.
    #[error("Payment verification failed")]
    PaymentVerificationFailed,

    /// External payment processor call failed.
    #[error("Payment provider error: {0}")]
    PaymentProvider(#[from] ProcessorError),

    /// Order store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    /// Stable error kind identifier used in response bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::PaymentVerificationFailed => "payment_verification_failed",
            Self::PaymentProvider(_) => "payment_provider",
            Self::Store(_) | Self::Internal(_) => "internal",
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side errors to Sentry. Client errors (bad input,
        // policy denials, state machine conflicts) are expected traffic.
        if matches!(
            self,
            Self::Store(_) | Self::Internal(_) | Self::PaymentProvider(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients. The verification
        // failure message stays generic so callers can't probe which part of
        // the signature payload mismatched.
        let message = match &self {
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::PaymentProvider(_) => "External payment provider error".to_string(),
            Self::PaymentVerificationFailed => "Payment verification failed".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
