//! Bad Marketplace Core - cart state, catalog and storage sync.
//!
//! This crate holds everything the storefront and the CLI share:
//! - `storefront` - JSON API hosting one shared storage area and its tabs
//! - `cli` - Command-line cart and catalog tools over a file-backed store
//!
//! # Architecture
//!
//! The core crate performs no network or file I/O. Storage, notifications
//! and presentation are reached through traits ([`DurableStore`],
//! [`NotificationSink`], [`CartView`]) so each binary plugs in its own.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and statuses
//! - [`catalog`] - Products, lookup, search and tag filters
//! - [`storage`] - Shared key-value storage with cross-context change feeds
//! - [`cart`] - The cart store, order summary and page projection
//! - [`notify`] / [`view`] - Collaborator interfaces the cart reports to

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod notify;
pub mod storage;
pub mod types;
pub mod view;

pub use cart::{CartError, CartPage, CartStore, LineItem, OrderSummary, ShippingPolicy};
pub use catalog::{Catalog, CatalogError, Product, ProductCatalog, ProductFilter, SearchQuery};
pub use notify::{Notification, NotificationSink, TracingNotifier};
pub use storage::{
    ChangeFeed, DurableStore, ExternalChangeListener, SharedStorage, StorageContext,
    StorageError, StorageEvent,
};
pub use types::*;
pub use view::{CartView, NoopView};
