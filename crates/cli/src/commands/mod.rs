//! Subcommand implementations.

pub mod cart;
pub mod catalog;
pub mod storage;

use std::io;
use std::path::Path;

use bad_marketplace_core::Catalog;

/// Load the catalog at `path`, or the embedded demo catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid catalog.
pub async fn load_catalog(path: Option<&Path>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(json) => Catalog::from_json(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(format!("Catalog not found: {}", path.display()).into());
            }
            Err(e) => return Err(e.into()),
        },
        None => Catalog::demo()?,
    };
    tracing::debug!(products = catalog.len(), "Catalog loaded");
    Ok(catalog)
}
