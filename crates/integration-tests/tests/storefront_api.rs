//! Integration tests for the storefront JSON API.
//!
//! These tests drive the full router (middleware included) in-process.

use axum::http::{Method, StatusCode};
use bad_marketplace_core::Page;
use bad_marketplace_integration_tests::TestContext;
use bad_marketplace_storefront::{config::StorefrontConfig, routes::tabs::TabInfo};
use serde_json::json;

// =============================================================================
// Health & Middleware
// =============================================================================

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let ctx = TestContext::new();
    let response = ctx.send(Method::GET, "/health", None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_listing_returns_demo_catalog() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(8));
    assert_eq!(body["products"][0]["name"], json!("Wireless Mouse"));
}

#[tokio::test]
async fn test_product_search_is_case_insensitive() {
    let ctx = TestContext::new();
    let (_, body) = ctx.get("/api/products?q=MUG").await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["products"][0]["id"], json!(3));
}

#[tokio::test]
async fn test_single_character_query_does_not_filter() {
    let ctx = TestContext::new();
    let (_, body) = ctx.get("/api/products?q=z").await;
    assert_eq!(body["total"], json!(8));
}

#[tokio::test]
async fn test_query_and_tag_filters_intersect() {
    let ctx = TestContext::new();
    let (_, body) = ctx.get("/api/products?q=keyboard&tag=office").await;
    assert_eq!(body["total"], json!(1));

    let (_, body) = ctx.get("/api/products?q=keyboard&tag=kitchen").await;
    assert_eq!(body["total"], json!(0));
}

#[tokio::test]
async fn test_tags_are_distinct() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/products/tags").await;
    assert_eq!(status, StatusCode::OK);

    let tags: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(tags.first(), Some(&"electronics"));
    let office = tags.iter().filter(|t| **t == "office").count();
    assert_eq!(office, 1);
}

#[tokio::test]
async fn test_product_detail_and_missing_product() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/products/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("Desk Lamp"));
    assert_eq!(body["price"], json!(2500));

    let (status, _) = ctx.get("/api/products/404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.get("/api/products/lamp").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Tabs
// =============================================================================

#[tokio::test]
async fn test_open_tab_without_body_defaults_to_catalog_page() {
    let ctx = TestContext::new();
    let (status, body) = ctx.request(Method::POST, "/api/tabs", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let info: TabInfo = serde_json::from_value(body).unwrap();
    assert_eq!(info.page, Page::Catalog);
    assert_eq!(info.count, 0);
}

#[tokio::test]
async fn test_unknown_and_malformed_tab_ids() {
    let ctx = TestContext::new();
    let unknown = uuid::Uuid::new_v4();

    let (status, _) = ctx.get(&format!("/api/tabs/{unknown}/cart")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.get("/api/tabs/not-a-tab/cart").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_closed_tab_is_gone() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (status, _) = ctx
        .request(Method::DELETE, &format!("/api/tabs/{tab}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&format!("/api/tabs/{tab}/cart")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tab_limit() {
    let ctx = TestContext::with_config(StorefrontConfig {
        max_tabs: 1,
        ..StorefrontConfig::default()
    });
    ctx.open_tab(Page::Catalog).await;

    let (status, _) = ctx.request(Method::POST, "/api/tabs", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_navigate_switches_page() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/api/tabs/{tab}/page"),
            Some(json!({ "page": "cart" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], json!("cart"));

    let (status, _) = ctx
        .request(
            Method::PUT,
            &format!("/api/tabs/{tab}/page"),
            Some(json!({ "page": "product" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_add_merges_quantities() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (status, _) = ctx.add(&tab, 1, 2).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = ctx.add(&tab, 1, 3).await;

    assert_eq!(body["lines"].as_array().unwrap().len(), 1);
    assert_eq!(body["lines"][0]["quantity"], json!(5));
    assert_eq!(body["summary"]["item_count"], json!(5));
}

#[tokio::test]
async fn test_add_defaults_to_one_unit() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (_, body) = ctx
        .post(&format!("/api/tabs/{tab}/cart/add"), json!({ "id": 3 }))
        .await;
    assert_eq!(body["summary"]["item_count"], json!(1));
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (status, _) = ctx.add(&tab, 999, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.cart(&tab).await["summary"]["item_count"], json!(0));
}

#[tokio::test]
async fn test_update_and_remove() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;
    ctx.add(&tab, 2, 1).await;
    ctx.add(&tab, 3, 1).await;

    let (_, body) = ctx
        .post(
            &format!("/api/tabs/{tab}/cart/update"),
            json!({ "id": 2, "quantity": 4 }),
        )
        .await;
    assert_eq!(body["summary"]["item_count"], json!(5));

    let (_, body) = ctx
        .post(
            &format!("/api/tabs/{tab}/cart/update"),
            json!({ "id": 2, "quantity": 0 }),
        )
        .await;
    assert_eq!(body["summary"]["item_count"], json!(1));

    let (_, body) = ctx
        .post(&format!("/api/tabs/{tab}/cart/remove"), json!({ "id": 3 }))
        .await;
    assert_eq!(body["lines"], json!([]));
}

#[tokio::test]
async fn test_update_absent_item_is_noop() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (status, body) = ctx
        .post(
            &format!("/api/tabs/{tab}/cart/update"),
            json!({ "id": 4, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["item_count"], json!(0));
}

#[tokio::test]
async fn test_clear_empties_cart() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;
    ctx.add(&tab, 4, 2).await;

    let (status, body) = ctx
        .request(Method::POST, &format!("/api/tabs/{tab}/cart/clear"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["item_count"], json!(0));
}

#[tokio::test]
async fn test_summary_shipping_threshold() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    // 1000 is below the 3000 threshold
    let (_, body) = ctx.add(&tab, 1, 1).await;
    assert_eq!(body["summary"]["shipping"]["kind"], json!("flat"));
    assert!(!body["summary"]["remaining_for_free_shipping"].is_null());

    // 4 x 1000 clears it
    let (_, body) = ctx.add(&tab, 1, 3).await;
    assert_eq!(body["summary"]["shipping"]["kind"], json!("free"));
    assert!(body["summary"]["remaining_for_free_shipping"].is_null());
}

#[tokio::test]
async fn test_money_fields_are_json_numbers() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (_, products) = ctx.get("/api/products").await;
    assert_eq!(products["products"][0]["price"], json!(1000));

    ctx.add(&tab, 1, 1).await;
    let (_, body) = ctx.add(&tab, 2, 1).await;

    assert_eq!(body["lines"][0]["lineTotal"], json!(1000));
    assert_eq!(body["summary"]["subtotal"], json!(3500));
    assert_eq!(body["summary"]["shipping"], json!({ "kind": "free" }));
    assert_eq!(body["summary"]["grand_total"], json!(3500));

    // 450 is under the 3000 threshold: flat 300 fee, 2550 to go
    ctx.request(Method::POST, &format!("/api/tabs/{tab}/cart/clear"), None)
        .await;
    let (_, body) = ctx.add(&tab, 3, 1).await;
    assert_eq!(body["summary"]["shipping"], json!({ "kind": "flat", "fee": 300 }));
    assert_eq!(body["summary"]["remaining_for_free_shipping"], json!(2550));
    assert_eq!(body["summary"]["grand_total"], json!(750));
}

#[tokio::test]
async fn test_checkout_keeps_cart() {
    let ctx = TestContext::new();
    let tab = ctx.open_tab(Page::Catalog).await;

    let (status, body) = ctx
        .request(Method::POST, &format!("/api/tabs/{tab}/checkout"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], json!(false));
    assert!(body["summary"].is_null());

    ctx.add(&tab, 5, 1).await;
    let (_, body) = ctx
        .request(Method::POST, &format!("/api/tabs/{tab}/checkout"), None)
        .await;
    assert_eq!(body["accepted"], json!(true));
    assert_eq!(body["summary"]["item_count"], json!(1));
    assert_eq!(ctx.cart(&tab).await["summary"]["item_count"], json!(1));
}
