//! Access policy for order operations.
//!
//! Pure functions, no side effects. Every store and gateway operation is
//! preceded by the relevant check; a violation surfaces as `Forbidden`, never
//! a silent no-op.

use little_sprout_core::Principal;

use crate::models::Order;

/// Whether the principal may read the given order.
///
/// Staff read any order; customers read only their own.
#[must_use]
pub fn can_read(principal: &Principal, order: &Order) -> bool {
    principal.is_staff() || principal.id == order.owner_id
}

/// Whether the principal may drive fulfillment transitions.
///
/// Staff-only, regardless of ownership.
#[must_use]
pub fn can_mutate_fulfillment(principal: &Principal) -> bool {
    principal.is_staff()
}

/// Whether the principal may initiate payment for the given order.
///
/// Owner-only: staff do not pay on behalf of customers.
#[must_use]
pub fn can_initiate_payment(principal: &Principal, order: &Order) -> bool {
    principal.id == order.owner_id
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::{address, item};
    use little_sprout_core::{IdentityProvider, Role, UserId};

    fn customer(id: UserId) -> Principal {
        Principal::new(id, Role::Customer, IdentityProvider::Local)
    }

    fn staff() -> Principal {
        Principal::new(UserId::generate(), Role::Staff, IdentityProvider::Local)
    }

    fn order_owned_by(owner: UserId) -> Order {
        Order::create(owner, vec![item("Rattle", "150", 1)], address()).unwrap()
    }

    #[test]
    fn test_owner_can_read_own_order() {
        let owner = UserId::generate();
        let order = order_owned_by(owner);
        assert!(can_read(&customer(owner), &order));
    }

    #[test]
    fn test_stranger_cannot_read_order() {
        let order = order_owned_by(UserId::generate());
        assert!(!can_read(&customer(UserId::generate()), &order));
    }

    #[test]
    fn test_staff_can_read_any_order() {
        let order = order_owned_by(UserId::generate());
        assert!(can_read(&staff(), &order));
    }

    #[test]
    fn test_only_staff_mutate_fulfillment() {
        assert!(can_mutate_fulfillment(&staff()));
        assert!(!can_mutate_fulfillment(&customer(UserId::generate())));
    }

    #[test]
    fn test_only_owner_initiates_payment() {
        let owner = UserId::generate();
        let order = order_owned_by(owner);
        assert!(can_initiate_payment(&customer(owner), &order));
        assert!(!can_initiate_payment(&customer(UserId::generate()), &order));
        // Staff are not the owner either
        assert!(!can_initiate_payment(&staff(), &order));
    }

    #[test]
    fn test_provider_does_not_affect_policy() {
        let owner = UserId::generate();
        let order = order_owned_by(owner);
        let federated = Principal::new(owner, Role::Customer, IdentityProvider::Google);
        assert!(can_read(&federated, &order));
        assert!(can_initiate_payment(&federated, &order));
    }
}
