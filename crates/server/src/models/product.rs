//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alankree_core::{Price, ProductCategory, ProductId};

/// Stock level below which a product counts as running low.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

const DEFAULT_RATING: f64 = 4.5;

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Price,
    pub category: ProductCategory,
    /// Absolute image URL (CDN or local uploads).
    pub image: String,
    pub rating: f64,
    pub reviews: i32,
    pub sizes: Vec<String>,
    /// Units on hand.
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product is in stock but below [`LOW_STOCK_THRESHOLD`].
    #[must_use]
    pub const fn is_running_low(&self) -> bool {
        self.stock > 0 && self.stock < LOW_STOCK_THRESHOLD
    }
}

/// Validation failures for product input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProductValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("rating must be between 0 and 5")]
    RatingOutOfRange,
    #[error("{0} cannot be negative")]
    Negative(&'static str),
}

/// Product fields as submitted by the back office, JSON or multipart.
///
/// Everything is optional so the same type serves create and partial update.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub original_price: Option<Price>,
    pub category: Option<ProductCategory>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub sizes: Option<Vec<String>>,
    pub stock: Option<i32>,
}

/// A complete, validated set of product fields ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Price,
    pub category: ProductCategory,
    pub image: String,
    pub rating: f64,
    pub reviews: i32,
    pub sizes: Vec<String>,
    pub stock: i32,
}

impl ProductInput {
    /// Validate input for a new product.
    ///
    /// `originalPrice` defaults to `price`; rating, reviews, sizes and stock
    /// fall back to catalog defaults.
    ///
    /// # Errors
    ///
    /// Returns the first missing or out-of-range field.
    pub fn into_draft(self) -> Result<ProductDraft, ProductValidationError> {
        let price = self.price.ok_or(ProductValidationError::Missing("price"))?;
        let draft = ProductDraft {
            name: required_text(self.name, "name")?,
            description: required_text(self.description, "description")?,
            price,
            original_price: self.original_price.unwrap_or(price),
            category: self
                .category
                .ok_or(ProductValidationError::Missing("category"))?,
            image: required_text(self.image, "image")?,
            rating: self.rating.unwrap_or(DEFAULT_RATING),
            reviews: self.reviews.unwrap_or(0),
            sizes: clean_sizes(self.sizes.unwrap_or_default()),
            stock: self.stock.unwrap_or(0),
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Merge input over an existing product for a partial update.
    ///
    /// # Errors
    ///
    /// Returns an error when a supplied field is blank or out of range.
    pub fn merge_into(self, existing: &Product) -> Result<ProductDraft, ProductValidationError> {
        let draft = ProductDraft {
            name: optional_text(self.name, "name")?.unwrap_or_else(|| existing.name.clone()),
            description: optional_text(self.description, "description")?
                .unwrap_or_else(|| existing.description.clone()),
            price: self.price.unwrap_or(existing.price),
            original_price: self.original_price.unwrap_or(existing.original_price),
            category: self.category.unwrap_or(existing.category),
            image: optional_text(self.image, "image")?.unwrap_or_else(|| existing.image.clone()),
            rating: self.rating.unwrap_or(existing.rating),
            reviews: self.reviews.unwrap_or(existing.reviews),
            sizes: self
                .sizes
                .map_or_else(|| existing.sizes.clone(), clean_sizes),
            stock: self.stock.unwrap_or(existing.stock),
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl ProductDraft {
    fn validate(&self) -> Result<(), ProductValidationError> {
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(ProductValidationError::RatingOutOfRange);
        }
        if self.reviews < 0 {
            return Err(ProductValidationError::Negative("reviews"));
        }
        if self.stock < 0 {
            return Err(ProductValidationError::Negative("stock"));
        }
        Ok(())
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ProductValidationError> {
    optional_text(value, field)?.ok_or(ProductValidationError::Missing(field))
}

fn optional_text(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<String>, ProductValidationError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if v.is_empty() => Err(ProductValidationError::Missing(field)),
        other => Ok(other),
    }
}

fn clean_sizes(sizes: Vec<String>) -> Vec<String> {
    sizes
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn saree_input() -> ProductInput {
        ProductInput {
            name: Some("Royal Red Silk Saree".to_string()),
            description: Some("Banarasi silk with zari border".to_string()),
            price: Some(Price::from_rupees(2500)),
            category: Some(ProductCategory::Saree),
            image: Some("https://cdn.example.in/red.jpg".to_string()),
            ..ProductInput::default()
        }
    }

    fn existing() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            name: "Golden Pearl Earrings".to_string(),
            description: "Pearl drops".to_string(),
            price: Price::from_rupees(800),
            original_price: Price::from_rupees(1000),
            category: ProductCategory::Earrings,
            image: "https://cdn.example.in/pearl.jpg".to_string(),
            rating: 4.2,
            reviews: 12,
            sizes: vec![],
            stock: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_into_draft_applies_defaults() {
        let draft = saree_input().into_draft().unwrap();
        assert_eq!(draft.original_price, Price::from_rupees(2500));
        assert!((draft.rating - 4.5).abs() < f64::EPSILON);
        assert_eq!(draft.stock, 0);
        assert!(draft.sizes.is_empty());
    }

    #[test]
    fn test_into_draft_requires_fields() {
        let mut input = saree_input();
        input.image = None;
        assert_eq!(
            input.into_draft().unwrap_err(),
            ProductValidationError::Missing("image")
        );

        let mut input = saree_input();
        input.name = Some("   ".to_string());
        assert_eq!(
            input.into_draft().unwrap_err(),
            ProductValidationError::Missing("name")
        );
    }

    #[test]
    fn test_into_draft_rejects_bad_rating() {
        let mut input = saree_input();
        input.rating = Some(5.5);
        assert_eq!(
            input.into_draft().unwrap_err(),
            ProductValidationError::RatingOutOfRange
        );
    }

    #[test]
    fn test_merge_into_keeps_unspecified_fields() {
        let input = ProductInput {
            price: Some(Price::from_rupees(750)),
            sizes: Some(vec![" Free Size ".to_string(), String::new()]),
            ..ProductInput::default()
        };
        let draft = input.merge_into(&existing()).unwrap();
        assert_eq!(draft.name, "Golden Pearl Earrings");
        assert_eq!(draft.price, Price::from_rupees(750));
        assert_eq!(draft.original_price, Price::from_rupees(1000));
        assert_eq!(draft.sizes, vec!["Free Size".to_string()]);
        assert_eq!(draft.stock, 4);
    }

    #[test]
    fn test_merge_into_rejects_negative_stock() {
        let input = ProductInput {
            stock: Some(-1),
            ..ProductInput::default()
        };
        assert_eq!(
            input.merge_into(&existing()).unwrap_err(),
            ProductValidationError::Negative("stock")
        );
    }

    #[test]
    fn test_running_low() {
        let mut product = existing();
        assert!(product.is_running_low());
        product.stock = 0;
        assert!(!product.is_running_low());
        product.stock = 10;
        assert!(!product.is_running_low());
    }

    #[test]
    fn test_input_from_json() {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "name": "Kundan Jhumkas",
            "description": "Gold-plated",
            "price": "1200",
            "originalPrice": 1500,
            "category": "earrings",
            "image": "https://cdn.example.in/jhumka.jpg",
            "sizes": ["Free Size"]
        }))
        .unwrap();
        let draft = input.into_draft().unwrap();
        assert_eq!(draft.category, ProductCategory::Earrings);
        assert_eq!(draft.original_price, Price::from_rupees(1500));
    }
}
