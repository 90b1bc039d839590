//! Cart commands over the file-backed store.

use std::path::Path;
use std::sync::Arc;

use bad_marketplace_core::{
    CartPage, CartStore, CartView, Catalog, ProductId, TracingNotifier, cart::Shipping,
};
use tracing::info;

use super::storage::FileStore;

/// Renders the cart to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleView;

impl CartView for ConsoleView {
    fn refresh_counter(&self, count: u64) {
        info!(count, "Cart updated");
    }

    fn render_cart(&self, page: &CartPage) {
        for line in render_lines(page) {
            info!("{line}");
        }
    }

    fn is_cart_page(&self) -> bool {
        true
    }
}

/// Text rows for a cart page.
pub fn render_lines(page: &CartPage) -> Vec<String> {
    if page.is_empty() {
        return vec!["Your cart is empty".to_string()];
    }

    let mut rows: Vec<String> = page
        .lines
        .iter()
        .map(|line| {
            format!(
                "#{} {} x{} = {}",
                line.id, line.product.name, line.quantity, line.line_total
            )
        })
        .collect();

    let summary = &page.summary;
    rows.push(format!(
        "Items: {}  Subtotal: {}",
        summary.item_count, summary.subtotal
    ));
    rows.push(match summary.shipping {
        Shipping::Free => "Shipping: free".to_string(),
        Shipping::Flat { fee } => match summary.remaining_for_free_shipping {
            Some(remaining) => format!("Shipping: {fee} (add {remaining} more for free shipping)"),
            None => format!("Shipping: {fee}"),
        },
    });
    rows.push(format!("Total: {}", summary.grand_total));
    rows
}

/// Open the cart stored at `storage_path`.
///
/// # Errors
///
/// Returns an error if the storage file exists but is unreadable.
pub fn open(storage_path: &Path, catalog: Catalog) -> Result<CartStore, Box<dyn std::error::Error>> {
    let store = FileStore::open(storage_path)?;
    info!(path = %store.path().display(), "Using storage file");
    Ok(CartStore::new(
        store,
        Arc::new(catalog),
        Arc::new(TracingNotifier),
        Arc::new(ConsoleView),
    ))
}

pub fn show(cart: &CartStore) {
    cart.render_cart();
}

/// # Errors
///
/// Returns an error if the product is not in the catalog.
pub fn add(cart: &mut CartStore, id: ProductId, quantity: u32) -> Result<(), Box<dyn std::error::Error>> {
    cart.add(id, quantity)?;
    Ok(())
}

pub fn update(cart: &mut CartStore, id: ProductId, quantity: i64) {
    if !cart.contains(id) {
        info!(product_id = %id, "Product is not in the cart");
    }
    cart.update(id, quantity);
}

pub fn remove(cart: &mut CartStore, id: ProductId) {
    cart.remove(id);
}

pub fn clear(cart: &mut CartStore) {
    cart.clear();
}

pub fn checkout(cart: &CartStore) {
    if cart.checkout().is_some() {
        cart.render_cart();
    }
}
