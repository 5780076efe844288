//! Permanent photo hosting
//!
//! Telegram file links expire, so order photos are re-hosted on a CDN
//! before the order is posted to the channel or persisted. The uploader
//! fetches nothing itself: it hands the Telegram download URL to the
//! hosting API, which pulls the file server-side.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// A successfully hosted photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedPhoto {
    /// Permanent CDN URL
    pub secure_url: String,
    /// Hosting-side identifier
    pub public_id: String,
}

/// Narrow interface over the photo-hosting service.
#[async_trait]
pub trait PhotoHost: Send + Sync {
    /// Uploads the file behind `source_url` into `folder`, returning the
    /// permanent URL and hosting id.
    async fn upload(&self, source_url: &str, folder: &str) -> AppResult<HostedPhoto>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: String,
}

/// Cloudinary-backed `PhotoHost` using the signed upload REST endpoint.
pub struct CloudinaryHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryHost {
    /// Builds the host from the `CLOUDINARY_*` environment configuration.
    ///
    /// Missing credentials are tolerated at startup; uploads then fail
    /// with a hosting error at submission time, which the wizard turns
    /// into a retryable failure.
    pub fn from_env() -> Self {
        if config::CLOUDINARY_CLOUD_NAME.is_empty() || config::CLOUDINARY_API_KEY.is_empty() {
            log::warn!("Cloudinary configuration is missing; photo uploads will fail until it is set.");
        }
        Self::with_credentials(
            config::CLOUDINARY_CLOUD_NAME.clone(),
            config::CLOUDINARY_API_KEY.clone(),
            config::CLOUDINARY_API_SECRET.clone(),
        )
    }

    pub fn with_credentials(cloud_name: String, api_key: String, api_secret: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config::network::timeout())
            .build()
            .unwrap_or_default();
        Self {
            client,
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// SHA-256 request signature over the signed params (alphabetical
    /// order, `file` and `api_key` excluded) plus the API secret.
    fn sign(&self, folder: &str, timestamp: i64) -> String {
        let to_sign = format!("folder={}&timestamp={}{}", folder, timestamp, self.api_secret);
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl PhotoHost for CloudinaryHost {
    async fn upload(&self, source_url: &str, folder: &str) -> AppResult<HostedPhoto> {
        let endpoint = format!("https://api.cloudinary.com/v1_1/{}/image/upload", self.cloud_name);
        let timestamp = Utc::now().timestamp();
        let signature = self.sign(folder, timestamp);

        log::debug!("Uploading photo to hosting folder '{}'", folder);

        let form = [
            ("file", source_url.to_string()),
            ("folder", folder.to_string()),
            ("timestamp", timestamp.to_string()),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response: UploadResponse = self.client.post(&endpoint).form(&form).send().await?.json().await?;

        if let Some(error) = response.error {
            return Err(AppError::Hosting(error.message));
        }

        match (response.secure_url, response.public_id) {
            (Some(secure_url), Some(public_id)) if !secure_url.is_empty() && !public_id.is_empty() => {
                log::info!("Photo hosted as {}", public_id);
                Ok(HostedPhoto { secure_url, public_id })
            }
            _ => Err(AppError::Hosting(
                "Hosting returned success but missing url or public id".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_stable_hex_sha256() {
        let host =
            CloudinaryHost::with_credentials("demo".to_string(), "key".to_string(), "secret".to_string());
        let sig = host.sign("orders/TSL-2026-08-06-001", 1_700_000_000);
        // 32 bytes hex-encoded, deterministic for fixed inputs
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, host.sign("orders/TSL-2026-08-06-001", 1_700_000_000));
        assert_ne!(sig, host.sign("orders/TSL-2026-08-06-002", 1_700_000_000));
    }
}
