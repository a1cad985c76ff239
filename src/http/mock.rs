//! Simulated vendor endpoint.
//!
//! Serves `/vendor-mock/prices/{id}` from the in-process [`SimulatedVendor`],
//! so a single process can play both the service and its flaky dependency.
//!
//! [`SimulatedVendor`]: crate::vendor::SimulatedVendor

use axum::{
    extract::{rejection::QueryRejection, Path, State},
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::server::AppState;
use crate::vendor::{DownstreamError, PriceQuery};

pub async fn mock_price(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
    query: Result<Query<PriceQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "msg": e.body_text() }))).into_response()
        }
    };

    match state.simulated.quote(product_id, &query).await {
        Ok(price) => Json(price).into_response(),
        Err(DownstreamError::Unavailable { status: 503 }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "msg": "Vendor service unavailable" })),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!(product_id, error = %e, "Simulated vendor failure");
            (StatusCode::BAD_GATEWAY, Json(json!({ "msg": "Transient upstream error" }))).into_response()
        }
    }
}
