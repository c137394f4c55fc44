//! Payment reconciliation gateway.
//!
//! Two halves:
//! - intent creation: convert the server-held order total to processor minor
//!   units and open an order on the processor's side (owner-only)
//! - capture: verify the signed callback and mark the order paid, exactly
//!   once, no matter how many times the callback is delivered

pub mod processor;
pub mod signature;

pub use processor::{HttpProcessor, PaymentProcessor, ProcessorError, ProcessorOrder};
pub use signature::SignatureValidator;

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;

use little_sprout_core::{CurrencyCode, OrderId, Principal, to_minor_units};

use crate::error::{AppError, Result};
use crate::models::{Order, PaymentResult};
use crate::policy;
use crate::store::{OrderStore, StoreError};

/// Response to an intent creation: everything the browser needs to open the
/// processor's checkout widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub order_id: OrderId,
    /// Processor-side order id.
    pub external_order_id: String,
    /// Amount in minor units (paise for INR).
    pub amount: i64,
    pub currency: CurrencyCode,
    /// Publishable key; not a secret.
    pub public_key: String,
}

/// Payment gateway service: intent creation and callback capture.
pub struct PaymentService {
    store: Arc<dyn OrderStore>,
    processor: Arc<dyn PaymentProcessor>,
    validator: SignatureValidator,
    public_key: String,
}

impl PaymentService {
    /// Assemble the service.
    pub fn new(
        store: Arc<dyn OrderStore>,
        processor: Arc<dyn PaymentProcessor>,
        signing_secret: SecretString,
        public_key: String,
    ) -> Self {
        Self {
            store,
            processor,
            validator: SignatureValidator::new(signing_secret),
            public_key,
        }
    }

    /// The processor's publishable key. No authorization required.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Create a payment intent for an order.
    ///
    /// Owner-only. The amount is always derived from the stored order total,
    /// never taken from the request. Does not mutate the order.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown order, `Forbidden` for a non-owner,
    /// `PaymentProvider` if the processor call fails.
    pub async fn create_intent(
        &self,
        principal: &Principal,
        order_id: OrderId,
        currency: CurrencyCode,
    ) -> Result<PaymentIntent> {
        let stored = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

        if !policy::can_initiate_payment(principal, &stored.order) {
            return Err(AppError::Forbidden(
                "only the order owner may initiate payment".to_string(),
            ));
        }

        // The explicit major -> minor conversion. The total was validated to
        // two decimal places at creation, so failure here means the stored
        // data is out of contract.
        let amount = to_minor_units(stored.order.total_price, currency).map_err(|e| {
            AppError::Internal(format!("order total not representable in minor units: {e}"))
        })?;

        let receipt = order_id.to_string();
        let processor_order = self.processor.create_order(amount, currency, &receipt).await?;

        Ok(PaymentIntent {
            order_id,
            external_order_id: processor_order.id,
            amount: processor_order.amount,
            currency,
            public_key: self.public_key.clone(),
        })
    }

    /// Verify a signed payment callback and capture the payment.
    ///
    /// The signature is checked before the order is even loaded, so a
    /// mismatch reveals nothing - not even whether the order exists. A
    /// callback for an already-paid order is an idempotent no-op success:
    /// processors redeliver webhooks, and redelivery must not double-capture
    /// or touch `paid_at`.
    ///
    /// # Errors
    ///
    /// `PaymentVerificationFailed` on signature mismatch, `NotFound` for an
    /// unknown order.
    pub async fn verify_and_capture(
        &self,
        order_id: OrderId,
        external_order_id: &str,
        external_payment_id: &str,
        provided_signature: &str,
    ) -> Result<Order> {
        if !self
            .validator
            .verify(external_order_id, external_payment_id, provided_signature)
        {
            tracing::warn!(order_id = %order_id, "payment callback signature mismatch");
            return Err(AppError::PaymentVerificationFailed);
        }

        // CAS loop: a racing duplicate webhook either loses the version race
        // and re-reads the now-paid order, or wins and captures. Either way
        // exactly one capture happens.
        loop {
            let stored = self
                .store
                .get(order_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

            if stored.order.is_paid {
                // Already captured; return the existing result untouched.
                return Ok(stored.order);
            }

            let mut order = stored.order;
            let now = Utc::now();
            order.is_paid = true;
            order.paid_at = Some(now);
            order.payment_result = Some(PaymentResult {
                external_payment_id: external_payment_id.to_string(),
                status: "success".to_string(),
                update_time: now,
            });

            match self.store.update(&order, stored.version).await {
                Ok(()) => {
                    tracing::info!(order_id = %order_id, "payment captured");
                    return Ok(order);
                }
                Err(StoreError::VersionConflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::processor::mock::MockProcessor;
    use super::*;
    use crate::models::order::tests::{address, item};
    use crate::store::MemoryOrderStore;
    use little_sprout_core::{IdentityProvider, Role, UserId};

    const SECRET: &str = "k9Qw3rT7yU1iO5pA8sD2fG6hJ4lZ0xCv";

    fn service_with(store: Arc<dyn OrderStore>, processor: Arc<dyn PaymentProcessor>) -> PaymentService {
        PaymentService::new(
            store,
            processor,
            SecretString::from(SECRET),
            "rzp_test_abc123".to_string(),
        )
    }

    async fn seeded(store: &MemoryOrderStore, owner: UserId) -> Order {
        let order = Order::create(
            owner,
            vec![item("Stroller", "500", 2), item("Bottle set", "300", 1)],
            address(),
        )
        .unwrap();
        store.insert(&order).await.unwrap();
        order
    }

    fn signature_for(order_ext: &str, payment_ext: &str) -> String {
        SignatureValidator::new(SecretString::from(SECRET)).sign(order_ext, payment_ext)
    }

    #[tokio::test]
    async fn test_create_intent_converts_to_minor_units() {
        let store = Arc::new(MemoryOrderStore::new());
        let processor = Arc::new(MockProcessor::default());
        let owner = UserId::generate();
        let order = seeded(&store, owner).await;
        let service = service_with(store, processor.clone());

        let principal = Principal::new(owner, Role::Customer, IdentityProvider::Local);
        let intent = service
            .create_intent(&principal, order.id, CurrencyCode::INR)
            .await
            .unwrap();

        // 1300 rupees -> 130_000 paise, exactly once
        assert_eq!(intent.amount, 130_000);
        assert_eq!(intent.currency, CurrencyCode::INR);
        assert_eq!(intent.public_key, "rzp_test_abc123");
        assert_eq!(
            processor.calls.lock().unwrap().as_slice(),
            &[(130_000, CurrencyCode::INR)]
        );

        // Intent creation never mutates the order
        let after = service.store.get(order.id).await.unwrap().unwrap();
        assert_eq!(after.order, order);
        assert_eq!(after.version, 0);
    }

    #[tokio::test]
    async fn test_create_intent_is_owner_only() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = seeded(&store, UserId::generate()).await;
        let service = service_with(store, Arc::new(MockProcessor::default()));

        let stranger = Principal::new(UserId::generate(), Role::Customer, IdentityProvider::Local);
        let err = service
            .create_intent(&stranger, order.id, CurrencyCode::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Staff are not the owner either
        let staff = Principal::new(UserId::generate(), Role::Staff, IdentityProvider::Local);
        let err = service
            .create_intent(&staff, order.id, CurrencyCode::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_intent_unknown_order() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_with(store, Arc::new(MockProcessor::default()));
        let principal = Principal::new(UserId::generate(), Role::Customer, IdentityProvider::Local);

        let err = service
            .create_intent(&principal, OrderId::generate(), CurrencyCode::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_intent_processor_failure_is_bad_gateway() {
        let store = Arc::new(MemoryOrderStore::new());
        let owner = UserId::generate();
        let order = seeded(&store, owner).await;
        let service = service_with(store, Arc::new(MockProcessor::failing()));

        let principal = Principal::new(owner, Role::Customer, IdentityProvider::Local);
        let err = service
            .create_intent(&principal, order.id, CurrencyCode::INR)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentProvider(_)));
    }

    #[tokio::test]
    async fn test_capture_happy_path() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = seeded(&store, UserId::generate()).await;
        let service = service_with(store, Arc::new(MockProcessor::default()));

        let sig = signature_for("order_ext_1", "pay_ext_1");
        let captured = service
            .verify_and_capture(order.id, "order_ext_1", "pay_ext_1", &sig)
            .await
            .unwrap();

        assert!(captured.is_paid);
        assert!(captured.paid_at.is_some());
        let result = captured.payment_result.unwrap();
        assert_eq!(result.external_payment_id, "pay_ext_1");
        assert_eq!(result.status, "success");
    }

    #[tokio::test]
    async fn test_capture_is_idempotent() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = seeded(&store, UserId::generate()).await;
        let service = service_with(store.clone(), Arc::new(MockProcessor::default()));

        let sig = signature_for("order_ext_1", "pay_ext_1");
        let first = service
            .verify_and_capture(order.id, "order_ext_1", "pay_ext_1", &sig)
            .await
            .unwrap();
        let second = service
            .verify_and_capture(order.id, "order_ext_1", "pay_ext_1", &sig)
            .await
            .unwrap();

        // Exactly one paid_at and one payment_result; redelivery changes nothing
        assert_eq!(first.paid_at, second.paid_at);
        assert_eq!(first.payment_result, second.payment_result);

        // Only the single capture write happened
        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_capture_race_captures_once() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = seeded(&store, UserId::generate()).await;
        let service = Arc::new(service_with(store.clone(), Arc::new(MockProcessor::default())));

        let sig = signature_for("order_ext_1", "pay_ext_1");
        let a = {
            let service = Arc::clone(&service);
            let sig = sig.clone();
            tokio::spawn(async move {
                service
                    .verify_and_capture(order.id, "order_ext_1", "pay_ext_1", &sig)
                    .await
            })
        };
        let b = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .verify_and_capture(order.id, "order_ext_1", "pay_ext_1", &sig)
                    .await
            })
        };

        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        assert!(first.is_paid && second.is_paid);
        assert_eq!(first.payment_result, second.payment_result);

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_tampered_signature_leaves_order_unpaid() {
        let store = Arc::new(MemoryOrderStore::new());
        let order = seeded(&store, UserId::generate()).await;
        let service = service_with(store.clone(), Arc::new(MockProcessor::default()));

        let mut sig = signature_for("order_ext_1", "pay_ext_1");
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });

        let err = service
            .verify_and_capture(order.id, "order_ext_1", "pay_ext_1", &sig)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentVerificationFailed));

        let stored = store.get(order.id).await.unwrap().unwrap();
        assert!(!stored.order.is_paid);
        assert!(stored.order.payment_result.is_none());
    }

    #[tokio::test]
    async fn test_valid_signature_unknown_order_is_not_found() {
        let store = Arc::new(MemoryOrderStore::new());
        let service = service_with(store, Arc::new(MockProcessor::default()));

        let sig = signature_for("order_ext_1", "pay_ext_1");
        let err = service
            .verify_and_capture(OrderId::generate(), "order_ext_1", "pay_ext_1", &sig)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
