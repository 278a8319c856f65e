//! Cloudinary REST client.
//!
//! Uploads go to `POST {base}/{cloud}/image/upload` and deletions to
//! `POST {base}/{cloud}/image/destroy`. Both are signed requests: the
//! signature is the hex SHA-256 of the alphabetically sorted `key=value`
//! parameters joined with `&`, followed by the API secret. The Cloudinary
//! account must be configured for SHA-256 signatures.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{ImageHost, MediaError, UploadFile};
use crate::config::{env_or, required, ConfigError};
use crate::db::models::BlogImage;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// HTTP request timeout for a single upload or destroy call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base: String,
}

impl CloudinaryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            folder: env_or("CLOUDINARY_FOLDER", "blog-images"),
            api_base: env_or("CLOUDINARY_API_BASE", DEFAULT_API_BASE),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.config.api_secret)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, MediaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MediaError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

/// Signature over `params` (excluding `file`, `api_key` and the signature
/// itself).
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, file: &UploadFile) -> Result<BlogImage, MediaError> {
        let timestamp = timestamp();
        let signature = self.sign(&[
            ("folder", self.config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("folder", self.config.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Malformed(e.to_string()))?;

        tracing::debug!(public_id = %uploaded.public_id, "image uploaded");
        Ok(BlogImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = timestamp();
        let signature = self.sign(&[
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
        ]);
        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;
        let destroyed: DestroyResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Malformed(e.to_string()))?;

        match destroyed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::Malformed(format!("destroy result {other:?}"))),
        }
    }
}
