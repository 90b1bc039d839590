//! Product catalog: lookup, listing, search and tag filtering.
//!
//! The cart treats the catalog as a read-only dictionary through
//! [`ProductCatalog`]. [`Catalog`] is the in-memory implementation used by
//! the storefront and the CLI, built from JSON or from the embedded demo seed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Price, ProductId};

/// Demo catalog shipped with the crate.
const DEMO_CATALOG: &str = include_str!("../data/catalog.json");

/// Queries shorter than this (in characters) do not filter the listing.
pub const MIN_QUERY_CHARS: usize = 2;

/// Errors building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate product id {0}")]
    DuplicateId(ProductId),
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),
}

/// A product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    /// Image reference (URL or path).
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    /// Case-insensitive substring match over name, description and tags.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }

    /// Whether the product carries exactly this tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Read-only product lookup consumed by the cart and listing surfaces.
pub trait ProductCatalog: Send + Sync {
    /// Look up a product by ID.
    fn get_by_id(&self, id: ProductId) -> Option<&Product>;

    /// All products in catalog order.
    fn all(&self) -> &[Product];

    /// Products matching a free-text query. An empty query matches everything.
    fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.all()
            .iter()
            .filter(|product| needle.is_empty() || product.matches(&needle))
            .collect()
    }

    /// Products carrying `tag`.
    fn by_tag(&self, tag: &str) -> Vec<&Product> {
        self.all()
            .iter()
            .filter(|product| product.has_tag(tag))
            .collect()
    }

    /// Distinct tags across the catalog, in first-seen order.
    fn tags(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.all()
            .iter()
            .flat_map(|product| product.tags.iter())
            .map(String::as_str)
            .filter(|tag| seen.insert(*tag))
            .collect()
    }
}

/// In-memory catalog indexed by product ID.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Build a catalog from product records.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two products share an ID and
    /// `CatalogError::NegativePrice` if a price is below zero.
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            if product.price.is_negative() {
                return Err(CatalogError::NegativePrice(product.id));
            }
            if index.insert(product.id, position).is_some() {
                return Err(CatalogError::DuplicateId(product.id));
            }
        }
        Ok(Self { products, index })
    }

    /// Parse a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails the checks of
    /// [`Catalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Self::new(products)
    }

    /// The demo catalog embedded in the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded seed is invalid.
    pub fn demo() -> Result<Self, CatalogError> {
        Self::from_json(DEMO_CATALOG)
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductCatalog for Catalog {
    fn get_by_id(&self, id: ProductId) -> Option<&Product> {
        self.index
            .get(&id)
            .and_then(|&position| self.products.get(position))
    }

    fn all(&self) -> &[Product] {
        &self.products
    }
}

/// A normalized listing query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchQuery {
    /// Show the full listing.
    #[default]
    All,
    /// Filter by this (trimmed) text.
    Text(String),
}

impl SearchQuery {
    /// Normalize raw user input.
    ///
    /// Blank input and input shorter than [`MIN_QUERY_CHARS`] show everything.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            Self::All
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}

/// Listing filter combining a text query and an optional tag.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub query: SearchQuery,
    pub tag: Option<String>,
}

impl ProductFilter {
    /// Apply the filter; both criteria must match when both are set.
    #[must_use]
    pub fn apply<'a, C: ProductCatalog + ?Sized>(&self, catalog: &'a C) -> Vec<&'a Product> {
        let candidates = match &self.query {
            SearchQuery::All => catalog.all().iter().collect(),
            SearchQuery::Text(text) => catalog.search(text),
        };
        match self.tag.as_deref() {
            Some(tag) => candidates
                .into_iter()
                .filter(|product| product.has_tag(tag))
                .collect(),
            None => candidates,
        }
    }
}
