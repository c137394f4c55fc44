//! HTTP route handlers for the orders service.
//!
//! # Route Structure
//!
//! ```text
//! # Orders
//! POST /orders                  - Create an order (owner = caller)
//! GET  /orders                  - List all orders (staff)
//! GET  /orders/mine             - List the caller's orders
//! GET  /orders/invoices         - Invoice projection (staff)
//! GET  /orders/{id}             - Fetch one order (owner or staff)
//! PUT  /orders/{id}/confirm     - pending -> confirmed (staff)
//! PUT  /orders/{id}/pack        - confirmed -> packed (staff)
//! PUT  /orders/{id}/ship        - packed -> shipped (staff)
//!
//! # Payment
//! POST /payment/create-order   - Register an order with the processor
//! POST /payment/verify         - Verify a payment callback signature
//! GET  /payment/key            - Publishable processor key (public)
//! ```
//!
//! `/health` and `/health/ready` are mounted separately in `main`.

pub mod orders;
pub mod payment;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_all).post(orders::create))
        .route("/mine", get(orders::mine))
        .route("/invoices", get(orders::invoices))
        .route("/{id}", get(orders::get_by_id))
        .route("/{id}/confirm", put(orders::confirm))
        .route("/{id}/pack", put(orders::pack))
        .route("/{id}/ship", put(orders::ship))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(payment::create_order))
        .route("/verify", post(payment::verify))
        .route("/key", get(payment::key))
}

/// Create all routes for the orders service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .nest("/payment", payment_routes())
}
