//! Application state shared across handlers.

use std::sync::Arc;

use bad_marketplace_core::{Catalog, CatalogError, ProductCatalog, SharedStorage};

use crate::config::StorefrontConfig;
use crate::tabs::TabRegistry;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("failed to read catalog {path}: {source}")]
    ReadCatalog {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It owns the single storage
/// area every tab of the storefront's origin shares.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<dyn ProductCatalog>,
    storage: SharedStorage,
    tabs: TabRegistry,
}

impl AppState {
    /// Create application state, loading the catalog named by the config.
    ///
    /// Falls back to the embedded demo catalog when no path is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog file cannot be read or parsed.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppStateError> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                let json =
                    std::fs::read_to_string(path).map_err(|source| AppStateError::ReadCatalog {
                        path: path.display().to_string(),
                        source,
                    })?;
                Catalog::from_json(&json)?
            }
            None => Catalog::demo()?,
        };
        tracing::info!(products = catalog.len(), "Catalog loaded");
        Ok(Self::with_catalog(config, catalog))
    }

    /// Create application state around an already-built catalog.
    #[must_use]
    pub fn with_catalog(config: StorefrontConfig, catalog: impl ProductCatalog + 'static) -> Self {
        let tabs = TabRegistry::new(config.max_tabs);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog: Arc::new(catalog),
                storage: SharedStorage::new(),
                tabs,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn ProductCatalog> {
        &self.inner.catalog
    }

    /// The storage area shared by all tabs.
    #[must_use]
    pub fn storage(&self) -> &SharedStorage {
        &self.inner.storage
    }

    #[must_use]
    pub fn tabs(&self) -> &TabRegistry {
        &self.inner.tabs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_without_path_uses_demo_catalog() {
        let state = AppState::new(StorefrontConfig::default()).unwrap();
        assert!(!state.catalog().all().is_empty());
    }

    #[test]
    fn new_reports_missing_catalog_file() {
        let config = StorefrontConfig {
            catalog_path: Some("/nonexistent/catalog.json".into()),
            ..StorefrontConfig::default()
        };
        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, AppStateError::ReadCatalog { .. }));
    }
}
