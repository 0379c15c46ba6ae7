//! # novabill-server: HTTP + WebSocket Boundary
//!
//! Thin adapter over [`BillingEngine`]:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   GET  /api/health                      liveness                        │
//! │   GET  /api/inventory                   list active items               │
//! │   POST /api/inventory                   create item                     │
//! │   GET  /api/inventory/{id}              fetch item                      │
//! │   PUT  /api/inventory/{id}              update name/price/rate/hsn      │
//! │   DEL  /api/inventory/{id}              retire item                     │
//! │   POST /api/inventory/{id}/replenish    add stock                       │
//! │   PUT  /api/inventory/{id}/quantity     set absolute quantity           │
//! │   GET  /api/invoices                    list, newest first              │
//! │   POST /api/invoices                    commit cart → invoice           │
//! │   GET  /api/invoices/{id}               fetch invoice                   │
//! │   POST /api/invoices/{id}/pay           pending → paid                  │
//! │   GET  /ws                              change feed (one-way)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Authentication is out of scope here; `createdBy` is trusted input from
//! the gateway in front of this service.

pub mod config;
pub mod error;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use novabill_engine::BillingEngine;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BillingEngine>,
}

/// Builds the full application router over an opened engine.
pub fn app(engine: Arc<BillingEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .nest("/api", routes::api_router())
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
