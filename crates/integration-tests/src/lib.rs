//! Integration tests for Bad Marketplace.
//!
//! The storefront router is driven in-process with
//! `tower::ServiceExt::oneshot`; no sockets are opened.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bad-marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_api` - Products, tabs and cart endpoints
//! - `cross_tab_sync` - Propagation of cart changes between tabs

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use bad_marketplace_core::{Catalog, Page};
use bad_marketplace_storefront::{app, config::StorefrontConfig, state::AppState};
use serde_json::Value;
use tower::ServiceExt;

/// A storefront wired to the demo catalog.
#[derive(Clone)]
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StorefrontConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let state = AppState::with_catalog(config, Catalog::demo().unwrap());
        Self {
            app: app(state.clone()),
            state,
        }
    }

    /// Send a request and return the raw response.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Send a request and decode the body as JSON (or a JSON string for text bodies).
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, uri, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    /// Open a tab on `page` and return its id.
    pub async fn open_tab(&self, page: Page) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/tabs",
                Some(serde_json::json!({ "page": page })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "open tab failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Add `quantity` of product `id` through `tab`.
    pub async fn add(&self, tab: &str, id: i32, quantity: u32) -> (StatusCode, Value) {
        self.post(
            &format!("/api/tabs/{tab}/cart/add"),
            serde_json::json!({ "id": id, "quantity": quantity }),
        )
        .await
    }

    /// The tab's current cart page.
    pub async fn cart(&self, tab: &str) -> Value {
        let (status, body) = self.get(&format!("/api/tabs/{tab}/cart")).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    /// Poll until the tab's cart reports `expected` items.
    ///
    /// Sibling tabs catch up asynchronously, so a single read may be stale.
    pub async fn wait_for_count(&self, tab: &str, expected: u64) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let cart = self.cart(tab).await;
            if cart["summary"]["item_count"].as_u64() == Some(expected) {
                return cart;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "tab {tab} never reached {expected} items, last seen {cart}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
