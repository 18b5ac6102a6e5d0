//! Public catalog routes.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use alankree_core::{ProductCategory, ProductId};

use crate::db::{CatalogQuery, CatalogSort, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Success};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductInput};
use crate::state::AppState;

/// Catalog filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParams {
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

impl From<CatalogParams> for CatalogQuery {
    fn from(params: CatalogParams) -> Self {
        Self {
            category: params.category,
            search: params.search.filter(|s| !s.trim().is_empty()),
            sort: CatalogSort::parse(params.sort_by.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductBody {
    pub product: Product,
}

/// List products, newest first unless another order is asked for.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CatalogParams>,
) -> Result<Success<ProductList>> {
    let products = ProductRepository::new(state.pool())
        .list(&params.into())
        .await?;
    Ok(Success::new(ProductList { products }))
}

/// GET /api/products/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Success<ProductBody>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Success::new(ProductBody { product }))
}

/// Create a product from a JSON body.
///
/// POST /api/products
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Success<ProductBody>)> {
    let draft = input.into_draft()?;
    let product = ProductRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Success::new(ProductBody { product })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_params_to_query() {
        let query: CatalogQuery = CatalogParams {
            category: Some(ProductCategory::Saree),
            search: Some("   ".to_string()),
            sort_by: Some("price_desc".to_string()),
        }
        .into();
        assert_eq!(query.category, Some(ProductCategory::Saree));
        assert!(query.search.is_none());
        assert_eq!(query.sort, CatalogSort::PriceDesc);
    }
}
