//! Product image storage.
//!
//! Images go to Cloudinary when credentials are configured, otherwise to the
//! local uploads directory served under `/uploads/`.

use std::path::PathBuf;

use chrono::Utc;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::config::{CloudinaryConfig, ServerConfig};

/// Maximum accepted upload size.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Cloudinary folder for product images.
const CLOUDINARY_FOLDER: &str = "alankree-sarees";
/// Product images are cropped to the card aspect ratio on upload.
const CLOUDINARY_TRANSFORMATION: &str = "c_fill,h_750,w_600";

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Errors that can occur when storing an image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Upload is not one of the accepted image types.
    #[error("only image files (jpeg, jpg, png, gif, webp) are allowed")]
    UnsupportedType,

    /// Upload exceeds [`MAX_IMAGE_BYTES`].
    #[error("image must be 5MB or smaller")]
    TooLarge,

    /// Upload has no content.
    #[error("image file is empty")]
    Empty,

    /// Writing to the local uploads directory failed.
    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),

    /// Cloudinary request failed or was rejected.
    #[error("image host error: {0}")]
    Upstream(String),
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Determine the format from the declared content type, falling back to
    /// the file extension.
    #[must_use]
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        let from_mime = content_type.and_then(|ct| {
            match ct.split(';').next()?.trim().to_ascii_lowercase().as_str() {
                "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
                "image/png" => Some(Self::Png),
                "image/gif" => Some(Self::Gif),
                "image/webp" => Some(Self::Webp),
                _ => None,
            }
        });

        from_mime.or_else(|| {
            let ext = file_name?.rsplit_once('.')?.1.to_ascii_lowercase();
            match ext.as_str() {
                "jpeg" | "jpg" => Some(Self::Jpeg),
                "png" => Some(Self::Png),
                "gif" => Some(Self::Gif),
                "webp" => Some(Self::Webp),
                _ => None,
            }
        })
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// An image received from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::UnsupportedType`, `ImageError::Empty` or
    /// `ImageError::TooLarge`.
    pub fn validate(&self) -> Result<ImageFormat, ImageError> {
        let format =
            ImageFormat::detect(self.content_type.as_deref(), self.file_name.as_deref())
                .ok_or(ImageError::UnsupportedType)?;
        if self.bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge);
        }
        Ok(format)
    }
}

/// Where a stored image can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub image_url: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<CloudinaryErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

/// Image storage backend.
#[derive(Clone)]
pub enum ImageStore {
    /// Signed uploads to Cloudinary.
    Cloudinary {
        client: Client,
        cloud_name: String,
        api_key: String,
        api_secret: SecretString,
    },
    /// Files on local disk, served by the API itself.
    Local {
        dir: PathBuf,
        public_base: String,
    },
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cloudinary { cloud_name, .. } => f
                .debug_struct("Cloudinary")
                .field("cloud_name", cloud_name)
                .field("api_secret", &"[REDACTED]")
                .finish_non_exhaustive(),
            Self::Local { dir, public_base } => f
                .debug_struct("Local")
                .field("dir", dir)
                .field("public_base", public_base)
                .finish(),
        }
    }
}

impl ImageStore {
    /// Pick the backend from configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        match &config.cloudinary {
            Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }) => Self::Cloudinary {
                client: Client::new(),
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            },
            None => Self::Local {
                dir: config.uploads_dir.clone(),
                public_base: config.upload_url(""),
            },
        }
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Cloudinary { .. } => "cloudinary",
            Self::Local { .. } => "local",
        }
    }

    /// Validate and store an image.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad uploads, `ImageError::Io` if the
    /// local write fails, and `ImageError::Upstream` if Cloudinary fails.
    #[instrument(skip(self, upload), fields(backend = self.backend(), size = upload.bytes.len()))]
    pub async fn store(&self, upload: ImageUpload) -> Result<StoredImage, ImageError> {
        let format = upload.validate()?;
        let filename = format!("{}.{}", Uuid::new_v4(), format.extension());

        match self {
            Self::Local { dir, public_base } => {
                tokio::fs::create_dir_all(dir).await?;
                tokio::fs::write(dir.join(&filename), &upload.bytes).await?;
                debug!(filename = %filename, "Image stored locally");
                Ok(StoredImage {
                    image_url: format!("{public_base}{filename}"),
                    filename,
                })
            }
            Self::Cloudinary {
                client,
                cloud_name,
                api_key,
                api_secret,
            } => {
                let timestamp = Utc::now().timestamp();
                let signature = sign_upload(timestamp, api_secret);

                let part = Part::bytes(upload.bytes)
                    .file_name(filename.clone())
                    .mime_str(format.mime())
                    .map_err(|e| ImageError::Upstream(e.to_string()))?;
                let form = Form::new()
                    .part("file", part)
                    .text("api_key", api_key.clone())
                    .text("timestamp", timestamp.to_string())
                    .text("folder", CLOUDINARY_FOLDER)
                    .text("transformation", CLOUDINARY_TRANSFORMATION)
                    .text("signature", signature)
                    .text("signature_algorithm", "sha256");

                let response = client
                    .post(format!("{CLOUDINARY_API_BASE}/{cloud_name}/image/upload"))
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| ImageError::Upstream(e.to_string()))?;

                let status = response.status();
                let body: CloudinaryResponse = response
                    .json()
                    .await
                    .map_err(|e| ImageError::Upstream(e.to_string()))?;

                match body {
                    CloudinaryResponse {
                        secure_url: Some(url),
                        public_id,
                        ..
                    } if status.is_success() => {
                        debug!(url = %url, "Image uploaded to Cloudinary");
                        Ok(StoredImage {
                            image_url: url,
                            filename: public_id.unwrap_or(filename),
                        })
                    }
                    other => {
                        let message = other
                            .error
                            .map_or_else(|| format!("upload failed with {status}"), |e| e.message);
                        error!(status = %status, message = %message, "Cloudinary upload failed");
                        Err(ImageError::Upstream(message))
                    }
                }
            }
        }
    }
}

/// Cloudinary request signature: SHA-256 of the sorted signed parameters
/// followed by the API secret.
fn sign_upload(timestamp: i64, api_secret: &SecretString) -> String {
    let to_sign = format!(
        "folder={CLOUDINARY_FOLDER}&timestamp={timestamp}&transformation={CLOUDINARY_TRANSFORMATION}{}",
        api_secret.expose_secret()
    );
    hex::encode(Sha256::digest(to_sign.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(content_type: &str, name: &str, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: Some(name.to_string()),
            content_type: Some(content_type.to_string()),
            bytes: vec![0xAB; len],
        }
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ImageFormat::detect(Some("image/jpg"), None),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::detect(Some("application/octet-stream"), Some("red.WEBP")),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::detect(Some("text/plain"), Some("notes.txt")), None);
        assert_eq!(ImageFormat::detect(None, None), None);
    }

    #[test]
    fn test_validate_size_limits() {
        assert!(upload("image/png", "a.png", MAX_IMAGE_BYTES).validate().is_ok());
        assert!(matches!(
            upload("image/png", "a.png", MAX_IMAGE_BYTES + 1).validate(),
            Err(ImageError::TooLarge)
        ));
        assert!(matches!(
            upload("image/png", "a.png", 0).validate(),
            Err(ImageError::Empty)
        ));
        assert!(matches!(
            upload("application/pdf", "a.pdf", 10).validate(),
            Err(ImageError::UnsupportedType)
        ));
    }

    #[test]
    fn test_signature_is_stable_hex() {
        let secret = SecretString::from("abcd");
        let a = sign_upload(1_700_000_000, &secret);
        let b = sign_upload(1_700_000_000, &secret);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_upload(1_700_000_001, &secret));
    }

    #[test]
    fn test_signature_covers_unix_seconds() {
        let secret = SecretString::from("abcd");
        let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            sign_upload(at.timestamp(), &secret),
            "a3d65ad0be5b7ac78737ef35ab6b6623bef047a4d2c8b4c24cf00ae87acd2d18"
        );
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let dir = std::env::temp_dir().join(format!("alankree-images-{}", Uuid::new_v4()));
        let store = ImageStore::Local {
            dir: dir.clone(),
            public_base: "http://localhost:5000/uploads/".to_string(),
        };

        let stored = store.store(upload("image/gif", "spin.gif", 16)).await.unwrap();
        assert!(stored.filename.ends_with(".gif"));
        assert_eq!(
            stored.image_url,
            format!("http://localhost:5000/uploads/{}", stored.filename)
        );
        let written = tokio::fs::read(dir.join(&stored.filename)).await.unwrap();
        assert_eq!(written.len(), 16);

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[test]
    fn test_from_config_defaults_to_local() {
        let store = ImageStore::from_config(&ServerConfig::for_tests());
        match store {
            ImageStore::Local { public_base, .. } => {
                assert_eq!(public_base, "http://localhost:5000/uploads/");
            }
            ImageStore::Cloudinary { .. } => panic!("expected local store"),
        }
    }
}
