//! Cart line items and their stored form.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// One product entry in the cart.
///
/// Serialized as `{"id": 1, "quantity": 2, "addedAt": "2024-05-01T10:00:00.000Z"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: ProductId,
    /// Always at least 1 while the item is in the cart.
    pub quantity: u32,
    /// Time of first insertion; quantity changes keep it.
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    /// A new line item added now, at millisecond precision.
    #[must_use]
    pub fn new(id: ProductId, quantity: u32) -> Self {
        Self {
            id,
            quantity,
            added_at: Utc::now().trunc_subsecs(3),
        }
    }
}

/// A line item joined with its catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine<'a> {
    pub item: &'a LineItem,
    pub product: &'a Product,
    /// `product.price * item.quantity`.
    pub line_total: Price,
}

impl<'a> CartLine<'a> {
    pub(crate) fn new(item: &'a LineItem, product: &'a Product) -> Self {
        Self {
            item,
            product,
            line_total: product.price.times(item.quantity),
        }
    }
}

/// Restore the cart invariants on a list read back from storage.
///
/// Zero quantities are dropped; duplicate IDs are merged into the first
/// occurrence, summing quantities.
pub(crate) fn normalize(items: Vec<LineItem>) -> Vec<LineItem> {
    let mut normalized: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            tracing::warn!(product_id = %item.id, "Dropping stored line item with zero quantity");
            continue;
        }
        match normalized.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                tracing::warn!(product_id = %item.id, "Merging duplicate stored line item");
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => normalized.push(item),
        }
    }
    normalized
}
