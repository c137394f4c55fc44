//! Shared type definitions.
//!
//! All types here are plain data: serde-friendly, no I/O. They are shared
//! between the service crates and their tests.

pub mod id;
pub mod money;
pub mod principal;
pub mod status;

pub use id::{OrderId, ProductId, UserId};
pub use money::{CurrencyCode, MoneyError, to_minor_units};
pub use principal::{IdentityProvider, Principal, Role};
pub use status::OrderStatus;
