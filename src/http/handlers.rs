//! Warehouse item and vendor price handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::ledger::{Item, ItemId};
use crate::resilience::CircuitState;
use crate::vendor::{PriceQuery, VendorMode, VendorPrice, VendorSnapshot};

#[derive(Debug, Deserialize)]
pub struct IncrementRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u64,
    /// Version the client last saw; defaults to the version read by the server.
    pub version: Option<u64>,
}

/// Which path a vendor price lookup takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Resilient,
    Direct,
}

impl Strategy {
    /// `resilient` (the default) selects the protected path; anything else goes direct.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("resilient") => Strategy::Resilient,
            Some(_) => Strategy::Direct,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Resilient => "resilient",
            Strategy::Direct => "direct",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VendorPriceParams {
    pub mode: Option<VendorMode>,
    pub fail_rate: Option<f64>,
    pub delay_ms: Option<u64>,
    pub strategy: Option<String>,
}

impl VendorPriceParams {
    fn price_query(&self) -> PriceQuery {
        let defaults = PriceQuery::default();
        PriceQuery {
            mode: self.mode.unwrap_or(defaults.mode),
            fail_rate: self.fail_rate.unwrap_or(defaults.fail_rate),
            delay_ms: self.delay_ms.unwrap_or(defaults.delay_ms),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VendorPriceResponse {
    #[serde(flatten)]
    pub price: VendorPrice,
    pub attempts: u32,
    pub strategy: &'static str,
    pub breaker_state: CircuitState,
}

/// Unwrap a numeric path segment, answering bad ones in the JSON error shape.
fn path_id<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("id must be a non-negative integer".into()))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn get_item(
    State(state): State<AppState>,
    id: Result<Path<ItemId>, PathRejection>,
) -> Result<Json<Item>, ApiError> {
    Ok(Json(state.inventory.get(path_id(id)?).await?))
}

pub async fn increment_item(
    State(state): State<AppState>,
    id: Result<Path<ItemId>, PathRejection>,
    payload: Result<Json<IncrementRequest>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let id = path_id(id)?;
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("delta must be integer".into()))?;
    let item = state.inventory.increment_atomic(id, body.delta).await?;
    Ok(Json(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    id: Result<Path<ItemId>, PathRejection>,
    payload: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let id = path_id(id)?;
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let item = state.inventory.set_quantity(id, body.quantity, body.version).await?;
    Ok(Json(item))
}

pub async fn vendor_state(State(state): State<AppState>) -> Json<VendorSnapshot> {
    Json(state.vendor.snapshot())
}

pub async fn vendor_price(
    State(state): State<AppState>,
    product_id: Result<Path<u64>, PathRejection>,
    params: Result<Query<VendorPriceParams>, QueryRejection>,
) -> Result<Json<VendorPriceResponse>, ApiError> {
    let product_id = path_id(product_id)?;
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = params.price_query();
    let strategy = Strategy::parse(params.strategy.as_deref());

    let fetch = match strategy {
        Strategy::Resilient => state.vendor.fetch_price(product_id, &query).await?,
        Strategy::Direct => state.vendor.fetch_price_direct(product_id, &query).await?,
    };

    tracing::debug!(
        product_id,
        strategy = strategy.as_str(),
        attempts = fetch.attempts,
        "Vendor price served"
    );

    Ok(Json(VendorPriceResponse {
        price: fetch.price,
        attempts: fetch.attempts,
        strategy: strategy.as_str(),
        breaker_state: fetch.breaker_state,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(Strategy::parse(None), Strategy::Resilient);
        assert_eq!(Strategy::parse(Some("resilient")), Strategy::Resilient);
        assert_eq!(Strategy::parse(Some("naive")), Strategy::Direct);
        assert_eq!(Strategy::parse(Some("")), Strategy::Direct);
    }

    #[test]
    fn test_params_fill_defaults() {
        let params = VendorPriceParams {
            mode: Some(VendorMode::Down),
            fail_rate: None,
            delay_ms: None,
            strategy: None,
        };
        let query = params.price_query();
        assert_eq!(query.mode, VendorMode::Down);
        assert_eq!(query.fail_rate, 0.3);
        assert_eq!(query.delay_ms, 0);
    }
}
