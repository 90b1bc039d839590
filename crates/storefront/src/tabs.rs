//! Tab contexts sharing one storage area.
//!
//! Every tab owns a [`CartStore`] on its own [`StorageContext`](bad_marketplace_core::StorageContext).
//! The tab's [`TabPresenter`] is both the cart's notification sink and its
//! view: everything the cart reports is published as a [`TabEvent`] to the
//! tab's event stream. A background task per tab waits on the tab's change
//! feed and replays sibling writes into the cart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use bad_marketplace_core::{
    CartPage, CartStore, ChangeFeed, ContextId, ExternalChangeListener, Notification,
    NotificationSink, Page, ProductCatalog, Severity, SharedStorage, ShippingPolicy,
    StorageError, view::CartView,
};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};

/// Buffered events per tab before slow subscribers start lagging.
const EVENT_BUFFER: usize = 64;

/// Identifier of an open tab.
pub type TabId = ContextId;

/// Something a tab's client should react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabEvent {
    /// Transient user-facing message.
    Notification(Notification),
    /// New value for the cart badge.
    Counter { count: u64 },
    /// Full cart page, sent only while the tab shows the cart.
    Cart(CartPage),
}

impl TabEvent {
    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::Counter { .. } => "counter",
            Self::Cart(_) => "cart",
        }
    }
}

/// Publishes a tab's notifications and view signals.
#[derive(Debug)]
pub struct TabPresenter {
    events: broadcast::Sender<TabEvent>,
    page: Mutex<Page>,
}

impl TabPresenter {
    fn new(page: Page) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            events,
            page: Mutex::new(page),
        }
    }

    /// Subscribe to this tab's events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }

    /// Number of live event subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// The page the tab is showing.
    #[must_use]
    pub fn page(&self) -> Page {
        *self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_page(&self, page: Page) {
        *self.page.lock().unwrap_or_else(PoisonError::into_inner) = page;
    }

    fn publish(&self, event: TabEvent) {
        // No subscribers is fine; nobody is watching this tab.
        let _ = self.events.send(event);
    }
}

impl NotificationSink for TabPresenter {
    fn notify(&self, message: &str, severity: Severity) {
        self.publish(TabEvent::Notification(Notification {
            message: message.to_string(),
            severity,
        }));
    }
}

impl CartView for TabPresenter {
    fn refresh_counter(&self, count: u64) {
        self.publish(TabEvent::Counter { count });
    }

    fn render_cart(&self, page: &CartPage) {
        self.publish(TabEvent::Cart(page.clone()));
    }

    fn is_cart_page(&self) -> bool {
        self.page() == Page::Cart
    }
}

/// One open tab.
#[derive(Debug)]
pub struct Tab {
    id: TabId,
    cart: tokio::sync::Mutex<CartStore>,
    presenter: Arc<TabPresenter>,
}

impl Tab {
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    /// The tab's cart. Hold the guard only for the duration of one operation.
    pub async fn cart(&self) -> tokio::sync::MutexGuard<'_, CartStore> {
        self.cart.lock().await
    }

    #[must_use]
    pub fn presenter(&self) -> &TabPresenter {
        &self.presenter
    }

    /// Switch pages; arriving on the cart page renders it.
    pub async fn navigate(&self, page: Page) {
        self.presenter.set_page(page);
        let cart = self.cart.lock().await;
        cart.refresh_counter();
        if page == Page::Cart {
            cart.render_cart();
        }
    }

    /// Re-render the cart if the tab is showing it.
    pub fn rerender_if_on_cart_page(&self, cart: &CartStore) {
        if self.presenter.is_cart_page() {
            cart.render_cart();
        }
    }
}

/// All open tabs of the storefront's single origin.
#[derive(Debug)]
pub struct TabRegistry {
    tabs: RwLock<HashMap<TabId, Arc<Tab>>>,
    max_tabs: usize,
}

/// Why a tab could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum OpenTabError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("tab limit of {0} reached")]
    LimitReached(usize),
}

impl TabRegistry {
    #[must_use]
    pub fn new(max_tabs: usize) -> Self {
        Self {
            tabs: RwLock::new(HashMap::new()),
            max_tabs,
        }
    }

    /// Open a tab on `storage`, loading whatever cart is stored there.
    ///
    /// Must be called within a Tokio runtime; the tab's sync task is spawned here.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage is unusable or the tab limit is reached.
    pub async fn open(
        &self,
        storage: &SharedStorage,
        catalog: Arc<dyn ProductCatalog>,
        shipping: ShippingPolicy,
        page: Page,
    ) -> Result<Arc<Tab>, OpenTabError> {
        let mut tabs = self.tabs.write().await;
        if tabs.len() >= self.max_tabs {
            return Err(OpenTabError::LimitReached(self.max_tabs));
        }

        let (context, feed) = storage.open_context()?;
        let id = context.id();
        let presenter = Arc::new(TabPresenter::new(page));
        let cart = CartStore::new(context, catalog, presenter.clone(), presenter.clone())
            .with_shipping_policy(shipping);

        let tab = Arc::new(Tab {
            id,
            cart: tokio::sync::Mutex::new(cart),
            presenter,
        });
        tokio::spawn(sync_tab(Arc::downgrade(&tab), feed));
        tabs.insert(id, tab.clone());

        tracing::info!(tab_id = %id, open_tabs = tabs.len(), "Tab opened");
        Ok(tab)
    }

    /// Look up an open tab.
    pub async fn get(&self, id: TabId) -> Option<Arc<Tab>> {
        self.tabs.read().await.get(&id).cloned()
    }

    /// Close a tab. Returns `false` if it was not open.
    pub async fn close(&self, id: TabId) -> bool {
        let removed = self.tabs.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(tab_id = %id, "Tab closed");
        }
        removed
    }

    /// Close a tab if no event stream is subscribed to it any more.
    ///
    /// Returns `true` if the tab was closed.
    pub async fn close_if_unwatched(&self, id: TabId) -> bool {
        let mut tabs = self.tabs.write().await;
        let unwatched = tabs
            .get(&id)
            .is_some_and(|tab| tab.presenter.subscriber_count() == 0);
        if unwatched {
            tabs.remove(&id);
            tracing::info!(tab_id = %id, "Tab closed after its last event stream ended");
        }
        unwatched
    }

    /// Number of open tabs.
    pub async fn len(&self) -> usize {
        self.tabs.read().await.len()
    }

    /// Whether no tabs are open.
    pub async fn is_empty(&self) -> bool {
        self.tabs.read().await.is_empty()
    }
}

/// Replay sibling writes into the tab's cart until the tab goes away.
///
/// The feed closes once the tab (and with it its storage context) is dropped.
async fn sync_tab(tab: Weak<Tab>, mut feed: ChangeFeed) {
    while let Some(event) = feed.recv().await {
        let Some(tab) = tab.upgrade() else {
            break;
        };
        tracing::debug!(tab_id = %tab.id, key = %event.key, "External storage change");
        tab.cart.lock().await.on_external_change(&event.key);
    }
}
