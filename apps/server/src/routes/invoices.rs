//! Invoice routes: listing, commit, and the pending → paid transition.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use novabill_core::{CartLine, Invoice};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub stock_item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Blank or absent records the sale against "walk-in".
    #[serde(default)]
    pub customer_name: String,
    pub items: Vec<CartLineRequest>,
    /// Creator reference from the upstream auth gate.
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_created_by() -> String {
    "system".to_string()
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Invoice>>, ApiError> {
    Ok(Json(state.engine.list_invoices().await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    Ok(Json(state.engine.get_invoice(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let cart: Vec<CartLine> = req
        .items
        .into_iter()
        .map(|line| CartLine {
            stock_item_id: line.stock_item_id,
            quantity: line.quantity,
        })
        .collect();

    let invoice = state
        .engine
        .create_invoice(&req.customer_name, &cart, &req.created_by)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    Ok(Json(state.engine.pay_invoice(&id).await?))
}
