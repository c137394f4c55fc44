//! Domain types for the orders service.
//!
//! These types represent validated domain objects separate from database row
//! types. Validation happens at construction; the rest of the service can
//! rely on an `Order` being internally consistent.

pub mod invoice;
pub mod order;

pub use invoice::Invoice;
pub use order::{
    DeliveryDetails, DeliveryPerson, LineItem, Order, OrderValidationError, PaymentResult,
    ShippingAddress,
};
