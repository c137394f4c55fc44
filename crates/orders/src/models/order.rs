//! The order aggregate and its component types.
//!
//! An order snapshots everything it needs at creation time: line item names
//! and prices are copies, not live product references, so the order stays
//! valid even if the catalog entry is later edited or deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use little_sprout_core::{OrderId, OrderStatus, ProductId, UserId};

/// A snapshotted product line captured at order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineItem {
    /// Reference to the product this line was created from.
    pub product_ref: ProductId,
    /// Product name as shown at checkout.
    pub name: String,
    /// Unit price at order time, in major currency units.
    pub unit_price: Decimal,
    /// Quantity ordered, at least 1.
    pub quantity: u32,
}

/// Shipping destination for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShippingAddress {
    pub address_line: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

/// Outcome of a verified payment capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Payment id assigned by the external processor.
    pub external_payment_id: String,
    /// Processor-reported status; "success" once captured.
    pub status: String,
    /// When this result was recorded.
    pub update_time: DateTime<Utc>,
}

/// Delivery agent details supplied by staff at shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeliveryPerson {
    pub name: String,
    pub phone: String,
    pub vehicle_number: String,
}

/// Delivery assignment attached to a shipped order.
///
/// The OTP is the customer-facing proof-of-delivery secret, generated once at
/// shipment and immutable thereafter. It is communicated out of band and must
/// never appear in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub person_name: String,
    pub phone: String,
    pub vehicle_number: String,
    pub otp: String,
}

/// Validation failures when constructing an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderValidationError {
    #[error("order must contain at least one line item")]
    EmptyLineItems,
    #[error("line item {index} has zero quantity")]
    ZeroQuantity { index: usize },
    #[error("line item {index} has a blank name")]
    BlankItemName { index: usize },
    #[error("line item {index} has a negative unit price")]
    NegativeUnitPrice { index: usize },
    #[error("line item {index} unit price has more than two decimal places")]
    ExcessPrecision { index: usize },
    #[error("shipping address field '{0}' must not be empty")]
    BlankAddressField(&'static str),
    #[error("order total overflows")]
    TotalOverflow,
}

/// The order aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// System-generated unique id, immutable.
    pub id: OrderId,
    /// Purchasing principal, set from the authenticated caller at creation.
    pub owner_id: UserId,
    /// Snapshotted line items, non-empty.
    pub line_items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    /// Server-computed sum of `unit_price * quantity` over all line items.
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub is_paid: bool,
    /// Set exactly once, when `is_paid` goes false -> true.
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    /// Present only once shipped.
    pub delivery_details: Option<DeliveryDetails>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order in `Pending` status, validating its inputs and
    /// computing the total server-side.
    ///
    /// The owner comes from the authenticated principal, never from the
    /// request body.
    ///
    /// # Errors
    ///
    /// Returns [`OrderValidationError`] on empty line items, zero quantities,
    /// blank names or address fields, negative or over-precise prices.
    pub fn create(
        owner_id: UserId,
        line_items: Vec<LineItem>,
        shipping_address: ShippingAddress,
    ) -> Result<Self, OrderValidationError> {
        validate_address(&shipping_address)?;
        let total_price = compute_total(&line_items)?;

        Ok(Self {
            id: OrderId::generate(),
            owner_id,
            line_items,
            shipping_address,
            total_price,
            status: OrderStatus::Pending,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            delivery_details: None,
            estimated_delivery_time: None,
            created_at: Utc::now(),
        })
    }
}

/// Compute the order total from its line items, validating each item.
///
/// # Errors
///
/// Returns [`OrderValidationError`] if any item is invalid or the total
/// overflows.
pub fn compute_total(line_items: &[LineItem]) -> Result<Decimal, OrderValidationError> {
    if line_items.is_empty() {
        return Err(OrderValidationError::EmptyLineItems);
    }

    let mut total = Decimal::ZERO;
    for (index, item) in line_items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(OrderValidationError::ZeroQuantity { index });
        }
        if item.name.trim().is_empty() {
            return Err(OrderValidationError::BlankItemName { index });
        }
        if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
            return Err(OrderValidationError::NegativeUnitPrice { index });
        }
        if item.unit_price.normalize().scale() > 2 {
            return Err(OrderValidationError::ExcessPrecision { index });
        }

        let line_total = item
            .unit_price
            .checked_mul(Decimal::from(item.quantity))
            .ok_or(OrderValidationError::TotalOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(OrderValidationError::TotalOverflow)?;
    }

    Ok(total)
}

fn validate_address(address: &ShippingAddress) -> Result<(), OrderValidationError> {
    let fields: [(&'static str, &str); 5] = [
        ("addressLine", &address.address_line),
        ("city", &address.city),
        ("postalCode", &address.postal_code),
        ("country", &address.country),
        ("phone", &address.phone),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(OrderValidationError::BlankAddressField(name));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    pub fn item(name: &str, price: &str, quantity: u32) -> LineItem {
        LineItem {
            product_ref: ProductId::generate(),
            name: name.to_string(),
            unit_price: Decimal::from_str(price).unwrap(),
            quantity,
        }
    }

    pub fn address() -> ShippingAddress {
        ShippingAddress {
            address_line: "12 Gandhi Street".to_string(),
            city: "Chennai".to_string(),
            postal_code: "600001".to_string(),
            country: "India".to_string(),
            phone: "9876543210".to_string(),
        }
    }

    #[test]
    fn test_create_computes_total_server_side() {
        let order = Order::create(
            UserId::generate(),
            vec![item("Stroller", "500", 2), item("Bottle set", "300", 1)],
            address(),
        )
        .unwrap();

        assert_eq!(order.total_price, Decimal::from(1300));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert!(order.paid_at.is_none());
        assert!(order.payment_result.is_none());
        assert!(order.delivery_details.is_none());
    }

    #[test]
    fn test_create_rejects_empty_line_items() {
        let err = Order::create(UserId::generate(), vec![], address()).unwrap_err();
        assert_eq!(err, OrderValidationError::EmptyLineItems);
    }

    #[test]
    fn test_create_rejects_zero_quantity() {
        let err = Order::create(UserId::generate(), vec![item("Bib", "50", 0)], address())
            .unwrap_err();
        assert_eq!(err, OrderValidationError::ZeroQuantity { index: 0 });
    }

    #[test]
    fn test_create_rejects_negative_price() {
        let err = Order::create(UserId::generate(), vec![item("Bib", "-5", 1)], address())
            .unwrap_err();
        assert_eq!(err, OrderValidationError::NegativeUnitPrice { index: 0 });
    }

    #[test]
    fn test_create_rejects_sub_paise_precision() {
        let err = Order::create(UserId::generate(), vec![item("Bib", "5.001", 1)], address())
            .unwrap_err();
        assert_eq!(err, OrderValidationError::ExcessPrecision { index: 0 });
    }

    #[test]
    fn test_trailing_zero_precision_is_fine() {
        let order = Order::create(
            UserId::generate(),
            vec![item("Bib", "5.00", 1)],
            address(),
        )
        .unwrap();
        assert_eq!(order.total_price, Decimal::from(5));
    }

    #[test]
    fn test_create_rejects_blank_address_field() {
        let mut bad = address();
        bad.postal_code = "  ".to_string();
        let err = Order::create(UserId::generate(), vec![item("Bib", "50", 1)], bad).unwrap_err();
        assert_eq!(err, OrderValidationError::BlankAddressField("postalCode"));
    }

    #[test]
    fn test_line_item_rejects_unknown_fields() {
        let json = r#"{"productRef":"11111111-1111-1111-1111-111111111111",
                       "name":"Bib","unitPrice":"50","quantity":1,"totalPrice":"1"}"#;
        assert!(serde_json::from_str::<LineItem>(json).is_err());
    }

    #[test]
    fn test_order_serde_round_trip() {
        let order = Order::create(
            UserId::generate(),
            vec![item("Stroller", "499.99", 1)],
            address(),
        )
        .unwrap();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "pending");
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
