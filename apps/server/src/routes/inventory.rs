//! Inventory routes.
//!
//! Requests carry decimal currency (`"price": 40.0`) and percentage tax
//! rates (`"taxRate": 18.0`) for client convenience; the boundary converts
//! to integer cents / basis points before anything else sees them.
//! Responses are the engine's own types: integer cents and bps.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use novabill_core::{StockItem, TaxRate};
use novabill_engine::{NewStockItem, StockItemUpdate};

use crate::error::ApiError;
use crate::AppState;

fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity: i64,
    /// Decimal currency, e.g. 40.0 for 40.00.
    pub price: f64,
    /// Percentage, e.g. 18.0. Defaults to 18% when omitted.
    pub tax_rate: Option<f64>,
    pub hsn_code: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub tax_rate: Option<f64>,
    /// `null` clears the code; absent leaves it alone.
    #[serde(default, deserialize_with = "double_option")]
    pub hsn_code: Option<Option<String>>,
}

/// Distinguishes `"hsnCode": null` (clear) from an absent field (keep).
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    Option::<String>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplenishRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<StockItem>> {
    Json(state.engine.list_stock().await)
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StockItem>, ApiError> {
    Ok(Json(state.engine.get_stock_item(&id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<StockItem>), ApiError> {
    let item = state
        .engine
        .create_stock_item(NewStockItem {
            name: req.name,
            quantity: req.quantity,
            unit_price_cents: to_cents(req.price),
            tax_rate_bps: req.tax_rate.map(|pct| TaxRate::from_percentage(pct).bps()),
            hsn_code: req.hsn_code,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<StockItem>, ApiError> {
    let item = state
        .engine
        .update_stock_item(
            &id,
            StockItemUpdate {
                name: req.name,
                unit_price_cents: req.price.map(to_cents),
                tax_rate_bps: req.tax_rate.map(|pct| TaxRate::from_percentage(pct).bps()),
                hsn_code: req.hsn_code,
            },
        )
        .await?;
    Ok(Json(item))
}

pub async fn replenish(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReplenishRequest>,
) -> Result<Json<StockItem>, ApiError> {
    Ok(Json(state.engine.replenish(&id, req.amount).await?))
}

pub async fn set_quantity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<StockItem>, ApiError> {
    Ok(Json(state.engine.set_stock_quantity(&id, req.quantity).await?))
}

pub async fn retire(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StockItem>, ApiError> {
    Ok(Json(state.engine.retire_stock_item(&id).await?))
}
