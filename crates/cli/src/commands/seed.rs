//! Seed the catalog from a YAML file.
//!
//! Each entry uses the same camelCase fields as the product API.

use std::path::Path;

use tracing::{error, info};

use alankree_server::db::ProductRepository;
use alankree_server::models::{ProductDraft, ProductInput};

use super::connect;

/// Sample catalog bundled with the binary.
const SAMPLE_CATALOG: &str = include_str!("../../data/products.yaml");

/// Parse and validate every entry of a catalog file.
///
/// Returns the drafts, or one message per invalid entry.
pub fn parse_catalog(content: &str) -> Result<Vec<ProductDraft>, Vec<String>> {
    let inputs: Vec<ProductInput> =
        serde_yaml::from_str(content).map_err(|e| vec![format!("invalid YAML: {e}")])?;

    let mut drafts = Vec::with_capacity(inputs.len());
    let mut errors = Vec::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let name = input.name.clone().unwrap_or_default();
        match input.into_draft() {
            Ok(draft) => drafts.push(draft),
            Err(e) => errors.push(format!("entry {} ({name}): {e}", index + 1)),
        }
    }

    if errors.is_empty() {
        Ok(drafts)
    } else {
        Err(errors)
    }
}

/// Insert products from `file` (or the bundled sample catalog).
///
/// # Errors
///
/// Returns an error if the file cannot be read, an entry is invalid, or a
/// database operation fails.
pub async fn products(file: Option<&str>, replace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let content = match file {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(format!("File not found: {file_path}").into());
            }
            info!(path = %file_path, "Loading catalog from file");
            tokio::fs::read_to_string(path).await?
        }
        None => SAMPLE_CATALOG.to_owned(),
    };

    // Validate everything before touching the database
    let drafts = match parse_catalog(&content) {
        Ok(drafts) => drafts,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(products = drafts.len(), "Catalog validated");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    if replace {
        let removed = repo.delete_all().await?;
        info!(removed, "Cleared existing products");
    }

    for draft in &drafts {
        let product = repo.create(draft).await?;
        info!(
            "  - {} ({}) - {}",
            product.name, product.category, product.price
        );
    }

    info!("Seeding complete! Added {} products", drafts.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alankree_core::ProductCategory;

    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let drafts = parse_catalog(SAMPLE_CATALOG).unwrap();
        assert_eq!(drafts.len(), 6);
        assert_eq!(
            drafts
                .iter()
                .filter(|d| d.category == ProductCategory::Earrings)
                .count(),
            3
        );
    }

    #[test]
    fn test_invalid_entries_reported_together() {
        let yaml = "
- name: No Price Saree
  description: d
  category: saree
  image: https://example.com/a.jpg
- name: Jhumka
  description: d
  price: 600
  category: earrings
  image: https://example.com/b.jpg
- name: No Image Studs
  description: d
  price: 900
  category: earrings
";
        let errors = parse_catalog(yaml).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("entry 1 (No Price Saree)"));
        assert!(errors[1].starts_with("entry 3 (No Image Studs)"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let yaml = "
- name: Bag
  description: d
  price: 10
  category: handbag
  image: https://example.com/b.jpg
";
        let errors = parse_catalog(yaml).unwrap_err();
        assert!(errors[0].starts_with("invalid YAML"));
    }
}
