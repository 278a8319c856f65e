//! Image hosting: the capability the blog handlers upload through, plus the
//! checks every uploaded file must pass first.

pub mod cloudinary;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::db::models::BlogImage;

pub use cloudinary::CloudinaryHost;

/// Images accepted per blog create/update request.
pub const MAX_IMAGES: usize = 5;

/// Per-file size cap.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// A file received in a multipart request, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image host returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected image host response: {0}")]
    Malformed(String),
}

/// External storage for blog images.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store one file and return its public URL and deletion handle.
    async fn upload(&self, file: &UploadFile) -> Result<BlogImage, MediaError>;

    /// Remove a previously uploaded image. Deleting an image the host no
    /// longer knows about succeeds.
    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Identify an image by its leading bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: RIFF ... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Reject files the host should never see. The error is the client-facing
/// message.
pub fn check_upload(file: &UploadFile) -> Result<(), String> {
    if file.bytes.is_empty() {
        return Err(format!("{} is empty", file.file_name));
    }
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(format!(
            "{} exceeds the {} MB limit",
            file.file_name,
            MAX_FILE_SIZE / (1024 * 1024)
        ));
    }
    if sniff_image_type(&file.bytes).is_none() {
        return Err(format!(
            "{} is not a supported image (jpeg, png, gif, webp)",
            file.file_name
        ));
    }
    Ok(())
}

/// Upload `files` one at a time, in order.
///
/// If any upload fails, the images already stored by this call are deleted
/// again before the error is returned.
pub async fn upload_all(
    host: &dyn ImageHost,
    files: &[UploadFile],
) -> Result<Vec<BlogImage>, MediaError> {
    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        match host.upload(file).await {
            Ok(image) => stored.push(image),
            Err(e) => {
                tracing::error!(file = %file.file_name, error = %e, "image upload failed");
                delete_all(host, &stored).await;
                return Err(e);
            }
        }
    }
    Ok(stored)
}

/// Best-effort removal; failures are logged and skipped.
pub async fn delete_all(host: &dyn ImageHost, images: &[BlogImage]) {
    for image in images {
        if let Err(e) = host.delete(&image.public_id).await {
            tracing::warn!(public_id = %image.public_id, error = %e, "failed to delete image");
        }
    }
}
