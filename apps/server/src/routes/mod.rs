//! REST route tree. All business decisions live in the engine; handlers
//! only translate between JSON DTOs and engine calls.

pub mod inventory;
pub mod invoices;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// Builds the `/api` route tree.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/inventory",
            get(inventory::list).post(inventory::create),
        )
        .route(
            "/inventory/{id}",
            get(inventory::get_one)
                .put(inventory::update)
                .delete(inventory::retire),
        )
        .route("/inventory/{id}/replenish", post(inventory::replenish))
        .route("/inventory/{id}/quantity", put(inventory::set_quantity))
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route("/invoices/{id}", get(invoices::get_one))
        .route("/invoices/{id}/pay", post(invoices::pay))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
