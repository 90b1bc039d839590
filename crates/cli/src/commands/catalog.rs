//! Catalog browsing commands.

use bad_marketplace_core::{Catalog, Product, ProductCatalog, ProductFilter, SearchQuery};
use tracing::info;

/// One listing row.
pub fn format_product(product: &Product) -> String {
    if product.tags.is_empty() {
        format!("#{} {} - {}", product.id, product.name, product.price)
    } else {
        format!(
            "#{} {} - {} [{}]",
            product.id,
            product.name,
            product.price,
            product.tags.join(", ")
        )
    }
}

fn print_products(products: &[&Product]) {
    if products.is_empty() {
        info!("No products found");
        return;
    }
    for product in products {
        info!("{}", format_product(product));
    }
    info!(count = products.len(), "Listed products");
}

/// List every product.
pub fn list(catalog: &Catalog) {
    let products: Vec<&Product> = catalog.all().iter().collect();
    print_products(&products);
}

/// Search names, descriptions and tags.
pub fn search(catalog: &Catalog, query: &str) {
    let filter = ProductFilter {
        query: SearchQuery::parse(query),
        tag: None,
    };
    if filter.query == SearchQuery::All {
        info!(query, "Query too short, showing everything");
    }
    print_products(&filter.apply(catalog));
}

/// Products with an exact tag.
pub fn tag(catalog: &Catalog, tag: &str) {
    print_products(&catalog.by_tag(tag));
}

/// Distinct tags.
pub fn tags(catalog: &Catalog) {
    let tags = catalog.tags();
    if tags.is_empty() {
        info!("Catalog has no tags");
    } else {
        info!("{}", tags.join(", "));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bad_marketplace_core::{Price, ProductId};

    use super::*;

    #[test]
    fn format_includes_tags_when_present() {
        let mut product = Product {
            id: ProductId::new(5),
            name: "Notebook".to_string(),
            price: Price::from_units(350),
            image: String::new(),
            description: String::new(),
            tags: vec!["paper".to_string(), "office".to_string()],
        };
        assert_eq!(format_product(&product), "#5 Notebook - 350 [paper, office]");

        product.tags.clear();
        assert_eq!(format_product(&product), "#5 Notebook - 350");
    }
}
