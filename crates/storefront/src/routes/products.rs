//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use bad_marketplace_core::{Product, ProductFilter, ProductId, SearchQuery};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Free-text search; fewer than two characters shows everything.
    pub q: Option<String>,
    /// Exact tag filter.
    pub tag: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            query: self
                .q
                .as_deref()
                .map_or(SearchQuery::All, SearchQuery::parse),
            tag: self
                .tag
                .as_deref()
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(String::from),
        }
    }
}

/// Product listing response.
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub total: usize,
    pub products: Vec<Product>,
}

/// List products, optionally filtered by search text and tag.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Json<ProductList> {
    let products: Vec<Product> = query
        .filter()
        .apply(state.catalog().as_ref())
        .into_iter()
        .cloned()
        .collect();

    tracing::debug!(matches = products.len(), "Product listing");
    Json(ProductList {
        total: products.len(),
        products,
    })
}

/// Distinct tags across the catalog.
pub async fn tags(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .catalog()
            .tags()
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

/// Single product detail.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid product id: {id}")))?;

    state
        .catalog()
        .get_by_id(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_query_does_not_filter() {
        let query = ListQuery {
            q: Some("a".to_string()),
            tag: None,
        };
        assert_eq!(query.filter().query, SearchQuery::All);
    }

    #[test]
    fn blank_tag_is_ignored() {
        let query = ListQuery {
            q: None,
            tag: Some("  ".to_string()),
        };
        assert!(query.filter().tag.is_none());
    }
}
