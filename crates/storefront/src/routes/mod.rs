//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                       - Health check
//!
//! # Products
//! GET    /api/products?q=&tag=         - Listing, search and tag filter
//! GET    /api/products/tags            - Distinct tags
//! GET    /api/products/{id}            - Product detail
//!
//! # Tabs
//! POST   /api/tabs                     - Open a tab
//! DELETE /api/tabs/{tab}               - Close a tab
//! PUT    /api/tabs/{tab}/page          - Switch page (catalog, cart)
//! GET    /api/tabs/{tab}/events        - Server-sent events
//!
//! # Cart
//! GET    /api/tabs/{tab}/cart          - Cart page projection
//! POST   /api/tabs/{tab}/cart/add      - Add product
//! POST   /api/tabs/{tab}/cart/update   - Set quantity
//! POST   /api/tabs/{tab}/cart/remove   - Remove line
//! POST   /api/tabs/{tab}/cart/clear    - Empty cart
//! POST   /api/tabs/{tab}/checkout      - Demo checkout
//! ```

pub mod cart;
pub mod products;
pub mod tabs;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/tags", get(products::tags))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router, nested under a tab.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the tab routes router.
pub fn tab_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(tabs::open))
        .route("/{tab}", axum::routing::delete(tabs::close))
        .route("/{tab}/page", put(tabs::navigate))
        .route("/{tab}/events", get(tabs::events))
        .route("/{tab}/checkout", post(cart::checkout))
        .nest("/{tab}/cart", cart_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/tabs", tab_routes())
}
