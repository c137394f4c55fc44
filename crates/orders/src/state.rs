//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::OrdersConfig;
use crate::fulfillment::FulfillmentService;
use crate::payment::{PaymentProcessor, PaymentService};
use crate::store::OrderStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the fulfillment and
/// payment services and the underlying store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn OrderStore>,
    fulfillment: FulfillmentService,
    payment: PaymentService,
}

impl AppState {
    /// Assemble application state from its parts.
    ///
    /// The store and processor are trait objects so tests can swap in the
    /// in-memory store and a mock processor.
    #[must_use]
    pub fn new(
        config: &OrdersConfig,
        store: Arc<dyn OrderStore>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let fulfillment = FulfillmentService::new(Arc::clone(&store));
        let payment = PaymentService::new(
            Arc::clone(&store),
            processor,
            config.payment.key_secret.clone(),
            config.payment.key_id.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                store,
                fulfillment,
                payment,
            }),
        }
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.inner.store
    }

    /// Get a reference to the fulfillment service.
    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.inner.fulfillment
    }

    /// Get a reference to the payment service.
    #[must_use]
    pub fn payment(&self) -> &PaymentService {
        &self.inner.payment
    }
}
