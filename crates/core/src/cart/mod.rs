//! The shopping cart and its storage synchronization.
//!
//! [`CartStore`] is the authoritative in-memory cart for one execution
//! context. It persists every mutation to a [`DurableStore`](crate::storage::DurableStore)
//! and reloads when a sibling context changes the stored cart.

mod line_item;
mod store;
mod summary;

use thiserror::Error;

use crate::storage::StorageError;
use crate::types::ProductId;

pub use line_item::{CartLine, LineItem};
pub use store::CartStore;
pub use summary::{
    CartPage, CartPageLine, DEFAULT_FREE_SHIPPING_THRESHOLD, DEFAULT_SHIPPING_FEE, OrderSummary,
    Shipping, ShippingPolicy,
};

/// Errors surfaced to callers of cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
}

/// Failures reading or writing the stored cart. Logged, never propagated.
#[derive(Debug, Error)]
pub(crate) enum PersistenceError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("malformed cart JSON: {0}")]
    Json(#[from] serde_json::Error),
}
