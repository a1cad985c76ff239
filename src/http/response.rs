//! Error responses.
//!
//! # Responsibilities
//! - Map domain errors to HTTP status codes
//! - Render every error as `{"msg", "error"}` JSON
//!
//! # Design Decisions
//! - Upstream 4xx answers are passed through; every other vendor failure is a gateway error
//! - A breaker rejection carries `Retry-After` when the remaining open time is known

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::inventory::InventoryError;
use crate::vendor::{DownstreamError, VendorError};

/// Error returned by any handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Vendor(#[from] VendorError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Inventory(e) => match e {
                InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
                InventoryError::VersionConflict { .. } | InventoryError::UpdateExhausted { .. } => {
                    StatusCode::CONFLICT
                }
                InventoryError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
                InventoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Vendor(e) => match e {
                VendorError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
                VendorError::RetryExhausted {
                    last_error: DownstreamError::Unavailable { status: 503 },
                    ..
                } => StatusCode::SERVICE_UNAVAILABLE,
                VendorError::RetryExhausted { .. } => StatusCode::BAD_GATEWAY,
                VendorError::Downstream {
                    error: DownstreamError::Client { status, .. },
                    ..
                } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                VendorError::Downstream { .. } => StatusCode::BAD_GATEWAY,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Inventory(e) => match e {
                InventoryError::NotFound(_) => "not_found",
                InventoryError::VersionConflict { .. } => "version_conflict",
                InventoryError::InvalidQuantity { .. } => "invalid_quantity",
                InventoryError::UpdateExhausted { .. } => "update_exhausted",
                InventoryError::Storage(_) => "storage",
            },
            ApiError::Vendor(e) => match e {
                VendorError::CircuitOpen { .. } => "circuit_open",
                VendorError::RetryExhausted { .. } => "retry_exhausted",
                VendorError::Downstream { .. } => "vendor_error",
            },
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let mut body = json!({
            "msg": self.to_string(),
            "error": self.kind(),
        });
        if let ApiError::Vendor(e) = &self {
            body["attempts"] = json!(e.attempts());
        }

        let mut response = (status, Json(body)).into_response();
        if let ApiError::Vendor(VendorError::CircuitOpen { error, .. }) = &self {
            if let Some(wait) = error.retry_after {
                let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
            }
        }
        response
    }
}
