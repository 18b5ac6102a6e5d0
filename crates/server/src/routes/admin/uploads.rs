//! Image upload for the product editor.

use axum::extract::{Multipart, State, multipart::Field};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::Success;
use crate::middleware::RequireAdmin;
use crate::services::images::{ImageUpload, StoredImage};
use crate::state::AppState;

/// Multipart field that carries the image file.
pub const IMAGE_FIELD: &str = "image";

/// Read a file field into an [`ImageUpload`].
pub(crate) async fn read_image(field: Field<'_>) -> Result<ImageUpload> {
    let file_name = field.file_name().map(str::to_owned);
    let content_type = field.content_type().map(str::to_owned);
    let bytes = field.bytes().await?;
    Ok(ImageUpload {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

#[derive(Debug, Serialize)]
pub struct UploadBody {
    pub message: &'static str,
    #[serde(flatten)]
    pub image: StoredImage,
}

/// POST /api/admin/upload-image
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    mut multipart: Multipart,
) -> Result<Success<UploadBody>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) && field.file_name().is_some() {
            upload = Some(read_image(field).await?);
            break;
        }
    }
    let upload =
        upload.ok_or_else(|| AppError::BadRequest("No image file provided".to_string()))?;

    let image = state.images().store(upload).await?;
    tracing::info!(
        filename = %image.filename,
        backend = state.images().backend(),
        "Image uploaded"
    );
    Ok(Success::new(UploadBody {
        message: "Image uploaded successfully",
        image,
    }))
}
