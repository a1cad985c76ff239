//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Build the shared application state from config
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::{handlers, mock, request};
use crate::inventory::InventoryUpdateService;
use crate::ledger::InMemoryLedger;
use crate::observability::metrics;
use crate::vendor::{HttpPriceSource, ResilientVendorClient, SimulatedVendor, VendorSetupError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<InventoryUpdateService>,
    pub vendor: Arc<ResilientVendorClient>,
    pub simulated: Arc<SimulatedVendor>,
}

impl AppState {
    /// Wire the ledger, inventory service and vendor client described by `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, VendorSetupError> {
        let ledger = Arc::new(InMemoryLedger::from_config(&config.ledger));
        let inventory = InventoryUpdateService::from_config(ledger, &config.ledger);
        let source = Arc::new(HttpPriceSource::from_config(&config.vendor)?);
        let vendor = ResilientVendorClient::from_config(config, source);

        Ok(Self {
            inventory: Arc::new(inventory),
            vendor: Arc::new(vendor),
            simulated: Arc::new(SimulatedVendor::new()),
        })
    }
}

/// HTTP server for the inventory service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a server with state built from `config`.
    pub fn new(config: ServiceConfig) -> Result<Self, VendorSetupError> {
        let state = AppState::from_config(&config)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around pre-built state.
    pub fn with_state(config: ServiceConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/warehouse_items/vendor_state", get(handlers::vendor_state))
            .route("/warehouse_items/vendor_price/{id}", get(handlers::vendor_price))
            .route(
                "/warehouse_items/{id}",
                get(handlers::get_item).put(handlers::update_item),
            )
            .route(
                "/warehouse_items/{id}/increment",
                post(handlers::increment_item),
            );

        if config.vendor.mock_enabled {
            router = router.route("/vendor-mock/prices/{id}", get(mock::mock_price));
        }

        router
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request::make_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for driving the service without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mock_vendor = self.config.vendor.mock_enabled,
            vendor_base_url = %self.config.vendor.base_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal, draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(&method, &route, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server(mock_enabled: bool) -> HttpServer {
        let mut config = ServiceConfig::default();
        config.vendor.mock_enabled = mock_enabled;
        HttpServer::new(config).unwrap()
    }

    async fn call(router: Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_owned())).unwrap_or_else(Body::empty))
            .unwrap();
        router.oneshot(request).await.unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_seeded_item_is_served_with_request_id() {
        let response = call(server(true).router(), "GET", "/warehouse_items/1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(request::X_REQUEST_ID));
        let body = json(response).await;
        assert_eq!(body["quantity"], 10);
        assert_eq!(body["version"], 1);
    }

    #[tokio::test]
    async fn test_error_mapping_through_router() {
        let router = server(true).router();

        let missing = call(router.clone(), "GET", "/warehouse_items/99", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(missing).await["error"], "not_found");

        let bad_delta = call(router.clone(), "POST", "/warehouse_items/1/increment", Some(r#"{"delta":"x"}"#)).await;
        assert_eq!(bad_delta.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(bad_delta).await["msg"], "delta must be integer");

        let negative = call(router.clone(), "POST", "/warehouse_items/1/increment", Some(r#"{"delta":-11}"#)).await;
        assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

        let stale = call(router, "PUT", "/warehouse_items/1", Some(r#"{"quantity":3,"version":7}"#)).await;
        assert_eq!(stale.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_increment_then_put() {
        let router = server(true).router();

        let inc = call(router.clone(), "POST", "/warehouse_items/1/increment", Some(r#"{"delta":5}"#)).await;
        assert_eq!(inc.status(), StatusCode::OK);
        let body = json(inc).await;
        assert_eq!(body["quantity"], 15);
        assert_eq!(body["version"], 2);

        let put = call(router, "PUT", "/warehouse_items/1", Some(r#"{"quantity":4}"#)).await;
        assert_eq!(put.status(), StatusCode::OK);
        assert_eq!(json(put).await["version"], 3);
    }

    #[tokio::test]
    async fn test_mock_vendor_modes() {
        let router = server(true).router();

        let down = call(router.clone(), "GET", "/vendor-mock/prices/3?mode=down", None).await;
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let flaky = call(router.clone(), "GET", "/vendor-mock/prices/3?mode=flaky&fail_rate=1", None).await;
        assert_eq!(flaky.status(), StatusCode::BAD_GATEWAY);

        let ok = call(router, "GET", "/vendor-mock/prices/3?mode=ok", None).await;
        assert_eq!(ok.status(), StatusCode::OK);
        let body = json(ok).await;
        assert_eq!(body["product_id"], 3);
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["vendor"], "MockVendor");
    }

    #[tokio::test]
    async fn test_mock_vendor_can_be_disabled() {
        let response = call(server(false).router(), "GET", "/vendor-mock/prices/3?mode=ok", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_vendor_state_starts_closed() {
        let response = call(server(true).router(), "GET", "/warehouse_items/vendor_state", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["state"], "closed");
        assert_eq!(body["failures"], 0);
        assert!(body["openedAt"].is_null());
        assert_eq!(body["endpoint"], "http://127.0.0.1:8080/vendor-mock");
        assert_eq!(body["attemptTimeoutMs"], 2000);
        assert_eq!(body["poolMaxIdle"], 10);
        assert_eq!(body["retry"]["maxAttempts"], 3);
        assert_eq!(body["retry"]["maxElapsedMs"], 5000);
    }

    #[tokio::test]
    async fn test_non_numeric_ids_get_json_errors() {
        let router = server(true).router();

        for (method, uri, body) in [
            ("GET", "/warehouse_items/abc", None),
            ("PUT", "/warehouse_items/-1", Some(r#"{"quantity": 1}"#)),
            ("POST", "/warehouse_items/x/increment", Some(r#"{"delta": 1}"#)),
            ("GET", "/warehouse_items/vendor_price/one", None),
        ] {
            let response = call(router.clone(), method, uri, body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
            let body = json(response).await;
            assert_eq!(body["error"], "bad_request", "{method} {uri}");
            assert_eq!(body["msg"], "id must be a non-negative integer");
        }
    }
}
