//! Presentation signals emitted by the cart.

use crate::cart::CartPage;

/// Whatever renders cart state for one execution context.
///
/// Both signals are idempotent and may be invoked at any time with current state.
pub trait CartView: Send + Sync {
    /// Update the item-count badge.
    fn refresh_counter(&self, count: u64);

    /// Re-render the full cart page.
    fn render_cart(&self, page: &CartPage);

    /// Whether the context is currently showing the cart page.
    fn is_cart_page(&self) -> bool;
}

/// A view that renders nothing and never shows the cart page.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopView;

impl CartView for NoopView {
    fn refresh_counter(&self, _count: u64) {}

    fn render_cart(&self, _page: &CartPage) {}

    fn is_cart_page(&self) -> bool {
        false
    }
}
