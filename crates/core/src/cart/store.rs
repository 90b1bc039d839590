//! The cart state store.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use super::line_item::{CartLine, LineItem, normalize};
use super::summary::{CartPage, CartPageLine, OrderSummary, ShippingPolicy};
use super::{CartError, PersistenceError};
use crate::catalog::ProductCatalog;
use crate::notify::NotificationSink;
use crate::storage::{
    CART_STORAGE_KEY, CART_UPDATED_KEY, ChangeFeed, DurableStore, ExternalChangeListener,
};
use crate::types::{Price, ProductId, Severity};
use crate::view::CartView;

/// The cart for one execution context.
///
/// Local mutations update memory, persist, and refresh the view directly.
/// Mutations made by sibling contexts arrive through the attached
/// [`ChangeFeed`] (or [`ExternalChangeListener::on_external_change`]) and
/// trigger a reload. Concurrent saves from two contexts are last-writer-wins.
pub struct CartStore {
    items: Vec<LineItem>,
    storage: Box<dyn DurableStore>,
    catalog: Arc<dyn ProductCatalog>,
    notifier: Arc<dyn NotificationSink>,
    view: Arc<dyn CartView>,
    shipping: ShippingPolicy,
    feed: Option<ChangeFeed>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("shipping", &self.shipping)
            .field("has_feed", &self.feed.is_some())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a cart and load its items from `storage`.
    pub fn new(
        storage: impl DurableStore + 'static,
        catalog: Arc<dyn ProductCatalog>,
        notifier: Arc<dyn NotificationSink>,
        view: Arc<dyn CartView>,
    ) -> Self {
        let mut cart = Self {
            items: Vec::new(),
            storage: Box::new(storage),
            catalog,
            notifier,
            view,
            shipping: ShippingPolicy::default(),
            feed: None,
        };
        cart.load();
        cart
    }

    /// Use a non-default shipping policy for summaries.
    #[must_use]
    pub fn with_shipping_policy(mut self, shipping: ShippingPolicy) -> Self {
        self.shipping = shipping;
        self
    }

    /// Register the source of external change notifications.
    ///
    /// Pending changes are delivered by [`Self::process_external_changes`].
    pub fn attach_change_feed(&mut self, feed: ChangeFeed) {
        self.feed = Some(feed);
    }

    /// Deliver every pending external change, returning how many were handled.
    pub fn process_external_changes(&mut self) -> usize {
        let Some(mut feed) = self.feed.take() else {
            return 0;
        };
        let delivered = feed.dispatch_pending(self);
        self.feed = Some(feed);
        delivered
    }

    /// Replace in-memory items with the stored list.
    ///
    /// Absent values load as an empty cart. Unreadable or malformed values are
    /// logged and also load as an empty cart.
    pub fn load(&mut self) {
        self.items = match self.read_items() {
            Ok(items) => items,
            Err(error) => {
                tracing::error!(%error, key = CART_STORAGE_KEY, "Failed to load cart, starting empty");
                Vec::new()
            }
        };
    }

    fn read_items(&self) -> Result<Vec<LineItem>, PersistenceError> {
        let Some(raw) = self.storage.get_item(CART_STORAGE_KEY)? else {
            return Ok(Vec::new());
        };
        let items: Vec<LineItem> = serde_json::from_str(&raw)?;
        Ok(normalize(items))
    }

    /// Persist the items, bump the change trigger, and refresh the counter.
    ///
    /// Write failures are logged; the in-memory cart stays authoritative.
    pub fn save(&mut self) {
        if let Err(error) = self.write_items() {
            tracing::error!(%error, key = CART_STORAGE_KEY, "Failed to persist cart");
        }
        self.refresh_counter();
    }

    fn write_items(&mut self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(&self.items)?;
        self.storage.set_item(CART_STORAGE_KEY, &json)?;
        // The list alone may be byte-identical to the previous save.
        let stamp = Utc::now().timestamp_millis().to_string();
        self.storage.set_item(CART_UPDATED_KEY, &stamp)?;
        Ok(())
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` (after notifying the user) if the
    /// product is not in the catalog. The cart is left untouched.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn add(&mut self, id: ProductId, quantity: u32) -> Result<&[LineItem], CartError> {
        let Some(name) = self.product_name(id) else {
            self.notifier.notify("Product not found", Severity::Error);
            return Err(CartError::ProductNotFound(id));
        };

        if quantity == 0 {
            tracing::warn!("Ignoring add with zero quantity");
            return Ok(&self.items);
        }

        if let Some(existing) = self.items.iter_mut().find(|item| item.id == id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            self.notifier
                .notify(&format!("Quantity of \"{name}\" increased"), Severity::Info);
        } else {
            self.items.push(LineItem::new(id, quantity));
            self.notifier
                .notify(&format!("\"{name}\" added to cart"), Severity::Success);
        }

        self.save();
        Ok(&self.items)
    }

    /// Remove a product's line item. Removing an absent item still persists.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn remove(&mut self, id: ProductId) -> &[LineItem] {
        let name = self.product_name(id);
        self.items.retain(|item| item.id != id);
        self.save();

        if let Some(name) = name {
            self.notifier
                .notify(&format!("\"{name}\" removed from cart"), Severity::Info);
        }
        &self.items
    }

    /// Overwrite a line item's quantity; zero or below removes it.
    ///
    /// Items not in the cart are left alone and nothing is persisted.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn update(&mut self, id: ProductId, quantity: i64) -> &[LineItem] {
        if !self.contains(id) {
            return &self.items;
        }
        if quantity <= 0 {
            return self.remove(id);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
        }
        self.save();
        &self.items
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> &[LineItem] {
        self.items.clear();
        self.save();
        self.notifier.notify("Cart cleared", Severity::Info);
        &self.items
    }

    /// Stored line items, including ones whose product left the catalog.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Whether a line item exists for `id`.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Line items joined with their products.
    ///
    /// Items whose product is no longer in the catalog are skipped (but kept
    /// in storage). The iterator is lazy and can be cloned to restart.
    pub fn items_with_details(&self) -> impl Iterator<Item = CartLine<'_>> + Clone + '_ {
        let catalog = &*self.catalog;
        self.items.iter().filter_map(move |item| {
            catalog
                .get_by_id(item.id)
                .map(|product| CartLine::new(item, product))
        })
    }

    /// Total quantity over every stored item.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of line totals over items still in the catalog.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items_with_details().map(|line| line.line_total).sum()
    }

    /// Totals and shipping for the current contents.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::compute(self.count(), self.total(), &self.shipping)
    }

    /// The full cart page projection.
    #[must_use]
    pub fn page(&self) -> CartPage {
        CartPage {
            lines: self.items_with_details().map(CartPageLine::from).collect(),
            summary: self.summary(),
        }
    }

    /// Demo checkout: reports what would be ordered, changes nothing.
    ///
    /// Returns the summary that was announced, or `None` for an empty cart.
    #[instrument(skip(self))]
    pub fn checkout(&self) -> Option<OrderSummary> {
        if self.items.is_empty() {
            self.notifier.notify("Cart is empty", Severity::Warning);
            return None;
        }

        let summary = self.summary();
        self.notifier.notify(
            &format!(
                "Checkout: {} item(s), total {}. This is a demo, so the order stays in the cart.",
                summary.item_count, summary.subtotal
            ),
            Severity::Info,
        );
        Some(summary)
    }

    /// Push the current count to the view.
    pub fn refresh_counter(&self) {
        self.view.refresh_counter(self.count());
    }

    /// Push the full cart page to the view.
    pub fn render_cart(&self) {
        self.view.render_cart(&self.page());
    }

    fn product_name(&self, id: ProductId) -> Option<String> {
        self.catalog
            .get_by_id(id)
            .map(|product| product.name.clone())
    }
}

impl ExternalChangeListener for CartStore {
    fn on_external_change(&mut self, key: &str) {
        if key != CART_STORAGE_KEY {
            return;
        }
        tracing::debug!("Cart changed in another context, reloading");
        self.load();
        self.refresh_counter();
        if self.view.is_cart_page() {
            self.render_cart();
        }
    }
}
