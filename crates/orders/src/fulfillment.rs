//! Fulfillment operations: order creation, reads, and the staff-driven
//! status transitions.
//!
//! Transitions are strictly forward, one step at a time, and deliberately
//! not idempotent: a repeated `confirm` fails with `InvalidTransition`
//! because the order is no longer `pending`. That is the guard against
//! double-clicked buttons and retried requests - no transition silently
//! succeeds on repeat.
//!
//! Concurrency: every transition is a compare-and-swap through the store's
//! version column. When two staff race the same transition, the loser's
//! write conflicts and is surfaced as `InvalidTransition` against the
//! now-updated status - never a silent overwrite.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use little_sprout_core::{OrderId, OrderStatus, Principal};

use crate::error::{AppError, Result};
use crate::models::{DeliveryDetails, DeliveryPerson, Invoice, LineItem, Order, ShippingAddress};
use crate::policy;
use crate::store::{OrderStore, StoreError, StoredOrder};

/// Fulfillment service over the order store.
pub struct FulfillmentService {
    store: Arc<dyn OrderStore>,
}

impl FulfillmentService {
    /// Create the service.
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Create a new order owned by the calling principal.
    ///
    /// The owner comes from the principal, the total is computed
    /// server-side; both are immune to request-body tampering.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on validation failure.
    pub async fn create_order(
        &self,
        principal: &Principal,
        line_items: Vec<LineItem>,
        shipping_address: ShippingAddress,
    ) -> Result<Order> {
        let order = Order::create(principal.id, line_items, shipping_address)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        self.store.insert(&order).await?;
        tracing::info!(order_id = %order.id, owner_id = %order.owner_id, "order created");
        Ok(order)
    }

    /// Fetch one order, subject to the read policy.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Forbidden` when the principal may not
    /// read it.
    pub async fn get_order(&self, principal: &Principal, id: OrderId) -> Result<Order> {
        let stored = self.load(id).await?;
        if !policy::can_read(principal, &stored.order) {
            return Err(AppError::Forbidden(
                "you may only read your own orders".to_string(),
            ));
        }
        Ok(stored.order)
    }

    /// List the calling principal's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<Order>> {
        Ok(self.store.list_by_owner(principal.id).await?)
    }

    /// List all orders. Staff only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-staff.
    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<Order>> {
        self.require_staff(principal)?;
        Ok(self.store.list_all().await?)
    }

    /// Staff-only invoice projection: one record per order, derived at read
    /// time.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-staff.
    pub async fn list_invoices(&self, principal: &Principal) -> Result<Vec<Invoice>> {
        self.require_staff(principal)?;
        let orders = self.store.list_all().await?;
        Ok(orders.iter().map(Invoice::from).collect())
    }

    /// `pending -> confirmed`. Staff only.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub async fn confirm(&self, principal: &Principal, id: OrderId) -> Result<Order> {
        self.transition(principal, id, OrderStatus::Confirmed, "confirm", |_| Ok(()))
            .await
    }

    /// `confirmed -> packed`. Staff only.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub async fn pack(&self, principal: &Principal, id: OrderId) -> Result<Order> {
        self.transition(principal, id, OrderStatus::Packed, "pack", |_| Ok(()))
            .await
    }

    /// `packed -> shipped`. Staff only.
    ///
    /// Optionally attaches a delivery assignment; doing so generates the
    /// order's OTP, once. An already-shipped order cannot be re-shipped, so
    /// the OTP can never regenerate.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status, `InvalidInput` for blank
    /// delivery-person fields or an estimated time in the past.
    pub async fn ship(
        &self,
        principal: &Principal,
        id: OrderId,
        delivery_person: Option<DeliveryPerson>,
        estimated_delivery_time: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        let delivery_details = delivery_person.map(assign_delivery).transpose()?;
        if let Some(estimated) = estimated_delivery_time {
            validate_estimated_delivery(estimated)?;
        }

        self.transition(principal, id, OrderStatus::Shipped, "ship", move |order| {
            order.delivery_details = delivery_details;
            order.estimated_delivery_time = estimated_delivery_time;
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load(&self, id: OrderId) -> Result<StoredOrder> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    fn require_staff(&self, principal: &Principal) -> Result<()> {
        if policy::can_mutate_fulfillment(principal) {
            Ok(())
        } else {
            Err(AppError::Forbidden("staff role required".to_string()))
        }
    }

    /// Shared transition skeleton: policy check, legality check, apply,
    /// CAS write.
    async fn transition<F>(
        &self,
        principal: &Principal,
        id: OrderId,
        target: OrderStatus,
        action: &'static str,
        apply: F,
    ) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> Result<()>,
    {
        self.require_staff(principal)?;

        let stored = self.load(id).await?;
        let from = stored.order.status;
        if !from.can_transition_to(target) {
            return Err(AppError::InvalidTransition { from, action });
        }

        let mut order = stored.order;
        order.status = target;
        apply(&mut order)?;

        match self.store.update(&order, stored.version).await {
            Ok(()) => {
                tracing::info!(order_id = %id, status = %target, "order transitioned");
                Ok(order)
            }
            // The order moved under us; report against what is there now.
            Err(StoreError::VersionConflict) => {
                let current = self.load(id).await?;
                Err(AppError::InvalidTransition {
                    from: current.order.status,
                    action,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Build delivery details from a staff-supplied assignment, generating the
/// one-time delivery code.
fn assign_delivery(person: DeliveryPerson) -> Result<DeliveryDetails> {
    for (field, value) in [
        ("name", &person.name),
        ("phone", &person.phone),
        ("vehicleNumber", &person.vehicle_number),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "delivery person field '{field}' must not be empty"
            )));
        }
    }

    Ok(DeliveryDetails {
        person_name: person.name,
        phone: person.phone,
        vehicle_number: person.vehicle_number,
        otp: generate_otp(),
    })
}

/// Four-digit delivery confirmation code in `[1000, 9999]`.
fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(1000..=9999);
    code.to_string()
}

fn validate_estimated_delivery(estimated: DateTime<Utc>) -> Result<()> {
    // Present-or-future, with a minute of clock slack
    if estimated < Utc::now() - chrono::Duration::minutes(1) {
        return Err(AppError::InvalidInput(
            "estimated delivery time must not be in the past".to_string(),
        ));
    }
    Ok(())
}
