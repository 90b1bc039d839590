//! Cart route handlers.
//!
//! Every handler acts on one tab's cart. Mutations persist to the shared
//! storage, which in turn wakes every sibling tab's sync task. The acting
//! tab re-renders itself when it is showing the cart page.

use axum::{
    Json,
    extract::{Path, State},
};
use bad_marketplace_core::{CartPage, OrderSummary, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::routes::tabs::lookup;
use crate::state::AppState;

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub id: ProductId,
    /// Defaults to one.
    pub quantity: Option<u32>,
}

/// Update quantity request. Zero or less removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub id: ProductId,
    pub quantity: i64,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub id: ProductId,
}

/// Checkout outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    /// `false` when the cart was empty.
    pub accepted: bool,
    pub summary: Option<OrderSummary>,
}

/// Current cart projection for a tab.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(tab): Path<String>) -> Result<Json<CartPage>> {
    let tab = lookup(&state, &tab).await?;
    let page = tab.cart().await.page();
    Ok(Json(page))
}

/// Add a product to the cart.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Path(tab): Path<String>,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartPage>> {
    let tab = lookup(&state, &tab).await?;
    let quantity = request.quantity.unwrap_or(1);

    let mut cart = tab.cart().await;
    cart.add(request.id, quantity)?;
    tab.rerender_if_on_cart_page(&cart);

    let product_id = request.id.to_string();
    add_breadcrumb(
        "cart",
        "Added product",
        Some(&[("product_id", product_id.as_str())]),
    );
    Ok(Json(cart.page()))
}

/// Set a line's quantity.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(tab): Path<String>,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartPage>> {
    let tab = lookup(&state, &tab).await?;

    let mut cart = tab.cart().await;
    cart.update(request.id, request.quantity);
    tab.rerender_if_on_cart_page(&cart);
    Ok(Json(cart.page()))
}

/// Remove a line.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(tab): Path<String>,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartPage>> {
    let tab = lookup(&state, &tab).await?;

    let mut cart = tab.cart().await;
    cart.remove(request.id);
    tab.rerender_if_on_cart_page(&cart);
    Ok(Json(cart.page()))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>, Path(tab): Path<String>) -> Result<Json<CartPage>> {
    let tab = lookup(&state, &tab).await?;

    let mut cart = tab.cart().await;
    cart.clear();
    tab.rerender_if_on_cart_page(&cart);
    Ok(Json(cart.page()))
}

/// Demo checkout. Announces the order and leaves the cart untouched.
#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(tab): Path<String>,
) -> Result<Json<CheckoutResponse>> {
    let tab = lookup(&state, &tab).await?;
    let summary = tab.cart().await.checkout();

    if summary.is_some() {
        add_breadcrumb("cart", "Checkout", None);
    }
    Ok(Json(CheckoutResponse {
        accepted: summary.is_some(),
        summary,
    }))
}
