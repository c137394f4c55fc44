//! Little Sprout Core - Shared types library.
//!
//! This crate provides common types used across all Little Sprout components:
//! - `orders` - Order fulfillment and payment reconciliation service
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money handling, order
//!   status, and the authenticated principal

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
