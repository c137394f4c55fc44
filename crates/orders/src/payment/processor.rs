//! External payment processor client.
//!
//! The processor hosts the card/UPI charge flow; this service only creates a
//! processor-side order (the "payment intent") and later verifies the signed
//! callback. There is no retry policy here - a failed call surfaces
//! immediately and the caller may retry the whole request.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use little_sprout_core::CurrencyCode;

use crate::config::PaymentConfig;

/// Errors from processor calls.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Transport-level failure.
    #[error("processor request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Processor answered with a non-success status.
    #[error("processor returned status {0}")]
    Status(StatusCode),

    /// Processor unreachable or refusing service.
    #[error("processor unavailable: {0}")]
    Unavailable(String),
}

/// Order record created on the processor's side.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorOrder {
    /// Processor-assigned order id, echoed back in the signed callback.
    pub id: String,
    /// Amount in minor units, as accepted by the processor.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Seam for the external processor, mockable in tests.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a processor-side order for the given minor-unit amount.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError`] if the call fails; never retried here.
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: CurrencyCode,
        receipt: &str,
    ) -> Result<ProcessorOrder, ProcessorError>;
}

/// HTTP client for the real processor API.
#[derive(Debug, Clone)]
pub struct HttpProcessor {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl HttpProcessor {
    /// Build a client from the payment configuration.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: CurrencyCode,
        receipt: &str,
    ) -> Result<ProcessorOrder, ProcessorError> {
        let body = CreateOrderBody {
            amount: amount_minor,
            currency: currency.code(),
            receipt,
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessorError::Status(status));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-process processor double for service and route tests.

    use std::sync::Mutex;

    use super::{PaymentProcessor, ProcessorError, ProcessorOrder};
    use async_trait::async_trait;
    use little_sprout_core::CurrencyCode;

    /// Records calls; answers with a deterministic processor order.
    #[derive(Debug, Default)]
    pub struct MockProcessor {
        pub fail: bool,
        pub calls: Mutex<Vec<(i64, CurrencyCode)>>,
    }

    impl MockProcessor {
        pub fn failing() -> Self {
            Self {
                fail: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentProcessor for MockProcessor {
        async fn create_order(
            &self,
            amount_minor: i64,
            currency: CurrencyCode,
            receipt: &str,
        ) -> Result<ProcessorOrder, ProcessorError> {
            if self.fail {
                return Err(ProcessorError::Unavailable("mock outage".to_string()));
            }
            #[allow(clippy::unwrap_used)]
            self.calls.lock().unwrap().push((amount_minor, currency));
            Ok(ProcessorOrder {
                id: format!("order_ext_{receipt}"),
                amount: amount_minor,
                currency: currency.code().to_string(),
            })
        }
    }
}
