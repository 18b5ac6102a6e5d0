//! Back-office catalog management.
//!
//! Create and update take multipart forms so the editor can send an image
//! file alongside the text fields. A plain `image` text field is treated as
//! an existing URL.

use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use alankree_core::{Price, ProductCategory, ProductId};

use super::uploads::{IMAGE_FIELD, read_image};
use crate::db::{CategoryStats, InventoryReport, ProductRepository, RepositoryError, SalesStats};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, Success};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductInput};
use crate::routes::products::CatalogParams;
use crate::services::images::ImageUpload;
use crate::state::AppState;

// =============================================================================
// Listing and inventory
// =============================================================================

/// A product with its sales figures.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithSales {
    #[serde(flatten)]
    pub product: Product,
    pub sales_stats: SalesStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOverview {
    pub products: Vec<ProductWithSales>,
    pub product_stats: Vec<CategoryStats>,
    pub total_products: usize,
}

/// GET /api/admin/products
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(params): ApiQuery<CatalogParams>,
) -> Result<Success<CatalogOverview>> {
    let repo = ProductRepository::new(state.pool());
    let products = repo.list(&params.into()).await?;
    let product_stats = repo.category_stats().await?;
    let mut sales = repo.sales_stats().await?;

    let products: Vec<ProductWithSales> = products
        .into_iter()
        .map(|product| ProductWithSales {
            sales_stats: sales.remove(&product.id).unwrap_or_default(),
            product,
        })
        .collect();

    Ok(Success::new(CatalogOverview {
        total_products: products.len(),
        products,
        product_stats,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    pub low_stock_products: Vec<Product>,
    pub out_of_stock_products: Vec<Product>,
    pub total_value: Price,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    pub total_products: i64,
    pub total_units: i64,
}

impl From<InventoryReport> for InventoryView {
    fn from(report: InventoryReport) -> Self {
        Self {
            low_stock_count: report.low_stock.len(),
            out_of_stock_count: report.out_of_stock.len(),
            low_stock_products: report.low_stock,
            out_of_stock_products: report.out_of_stock,
            total_value: report.total_inventory_value,
            total_products: report.total_products,
            total_units: report.total_units,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InventoryBody {
    pub inventory: InventoryView,
}

/// GET /api/admin/inventory
#[instrument(skip_all)]
pub async fn inventory(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Success<InventoryBody>> {
    let report = ProductRepository::new(state.pool())
        .inventory_report()
        .await?;
    Ok(Success::new(InventoryBody {
        inventory: report.into(),
    }))
}

// =============================================================================
// Multipart form
// =============================================================================

/// Collects text fields of the product form.
#[derive(Debug, Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    sizes: Vec<String>,
}

impl ProductForm {
    fn push(&mut self, name: &str, value: String) {
        match name {
            "sizes" | "sizes[]" => self.sizes.extend(split_sizes(&value)),
            _ => {
                self.fields.insert(name.to_owned(), value);
            }
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &'static str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.text(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| AppError::BadRequest(format!("Invalid {name}: {e}")))
            })
            .transpose()
    }

    fn into_input(self) -> Result<ProductInput> {
        let category = self
            .text("category")
            .map(|raw| {
                raw.to_lowercase()
                    .parse::<ProductCategory>()
                    .map_err(|e| AppError::BadRequest(format!("Invalid category: {e}")))
            })
            .transpose()?;

        Ok(ProductInput {
            name: self.text("name"),
            description: self.text("description"),
            price: self.parsed::<Price>("price")?,
            original_price: self.parsed::<Price>("originalPrice")?,
            category,
            image: self.text("image"),
            rating: self.parsed::<f64>("rating")?,
            reviews: self.parsed::<i32>("reviews")?,
            stock: self.parsed::<i32>("stock")?,
            sizes: (!self.sizes.is_empty()).then_some(self.sizes),
        })
    }
}

/// Sizes arrive as a JSON array or a comma-separated list.
fn split_sizes(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[')
        && let Ok(list) = serde_json::from_str::<Vec<String>>(raw)
    {
        return list;
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

async fn read_form(mut multipart: Multipart) -> Result<(ProductForm, Option<ImageUpload>)> {
    let mut form = ProductForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == IMAGE_FIELD && field.file_name().is_some() {
            let upload = read_image(field).await?;
            // Browsers send an empty part when no file was chosen
            if !upload.bytes.is_empty() {
                image = Some(upload);
            }
            continue;
        }
        let value = field.text().await?;
        form.push(&name, value);
    }

    Ok((form, image))
}

/// Read the form, storing any uploaded file and using its URL as `image`.
async fn product_input(state: &AppState, multipart: Multipart) -> Result<ProductInput> {
    let (form, upload) = read_form(multipart).await?;
    let mut input = form.into_input()?;
    if let Some(upload) = upload {
        let stored = state.images().store(upload).await?;
        input.image = Some(stored.image_url);
    }
    Ok(input)
}

// =============================================================================
// Create / update / delete
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ProductMessage {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

fn product_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
        other => other.into(),
    }
}

/// POST /api/admin/products
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    multipart: Multipart,
) -> Result<(StatusCode, Success<ProductMessage>)> {
    let draft = product_input(&state, multipart).await?.into_draft()?;
    let product = ProductRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(product_id = %product.id, name = %product.name, "Product added");

    Ok((
        StatusCode::CREATED,
        Success::new(ProductMessage {
            message: "Product added successfully",
            product,
        }),
    ))
}

/// PUT /api/admin/products/{productId}
///
/// Fields left out of the form keep their current values.
#[instrument(skip(state, _admin, multipart))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    multipart: Multipart,
) -> Result<Success<ProductMessage>> {
    let repo = ProductRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let draft = product_input(&state, multipart)
        .await?
        .merge_into(&existing)?;
    let product = repo.update(id, &draft).await.map_err(product_not_found)?;
    tracing::info!(product_id = %product.id, "Product updated");

    Ok(Success::new(ProductMessage {
        message: "Product updated successfully",
        product,
    }))
}

/// DELETE /api/admin/products/{productId}
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Success<Message>> {
    let product = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(product_not_found)?;
    tracing::info!(product_id = %product.id, name = %product.name, "Product deleted");

    Ok(Success::new(Message {
        message: "Product deleted successfully",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> ProductForm {
        let mut form = ProductForm::default();
        for (name, value) in pairs {
            form.push(name, (*value).to_string());
        }
        form
    }

    #[test]
    fn test_form_parses_typed_fields() {
        let input = form(&[
            ("name", " Kanjivaram Silk "),
            ("description", "Handwoven"),
            ("price", "12999.50"),
            ("category", "Saree"),
            ("stock", "4"),
            ("sizes", "Free Size"),
            ("image", ""),
        ])
        .into_input()
        .unwrap();

        assert_eq!(input.name.as_deref(), Some("Kanjivaram Silk"));
        assert_eq!(input.price, Some("12999.50".parse().unwrap()));
        assert_eq!(input.category, Some(ProductCategory::Saree));
        assert_eq!(input.stock, Some(4));
        assert_eq!(input.sizes, Some(vec!["Free Size".to_string()]));
        assert!(input.image.is_none());
        assert!(input.original_price.is_none());
    }

    #[test]
    fn test_form_rejects_bad_numbers() {
        let err = form(&[("price", "lots")]).into_input().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Invalid price")));

        let err = form(&[("category", "handbags")]).into_input().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_form_with_sizes_still_checks_stock() {
        let err = form(&[("sizes", "S,M"), ("stock", "plenty")])
            .into_input()
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Invalid stock")));
    }

    #[test]
    fn test_split_sizes() {
        assert_eq!(split_sizes(r#"["S", "M"]"#), vec!["S", "M"]);
        assert_eq!(split_sizes("S, M,,L"), vec!["S", "M", "L"]);
        assert!(split_sizes("  ").is_empty());
    }

    #[test]
    fn test_missing_sizes_left_unset() {
        let input = form(&[("name", "Jhumka")]).into_input().unwrap();
        assert!(input.sizes.is_none());
    }
}
