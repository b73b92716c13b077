//! Unsigned image uploads to Cloudinary.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use supernotes_core::{Error, ImageHost, ImageSource, Result};
use tracing::{error, info, instrument};

use crate::config::CloudinaryConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    error: UploadErrorBody,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

/// Sniff the bytes and reject anything that is not an image.
fn image_part(file_name: String, data: Vec<u8>) -> Result<Part> {
    let mime = match infer::get(&data) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind.mime_type(),
        Some(kind) => {
            return Err(Error::InvalidInput(format!(
                "Only image files can be uploaded (got {})",
                kind.mime_type()
            )))
        }
        None => {
            return Err(Error::InvalidInput(
                "Only image files can be uploaded".to_string(),
            ))
        }
    };
    Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| Error::Internal(format!("Failed to create multipart: {}", e)))
}

/// [`ImageHost`] posting to a Cloudinary unsigned upload preset.
pub struct CloudinaryImageHost {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryImageHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn form(&self, image: ImageSource) -> Result<Form> {
        let form = match image {
            ImageSource::Bytes { file_name, data } => {
                Form::new().part("file", image_part(file_name, data)?)
            }
            ImageSource::DataUrl(url) => {
                if !url.starts_with("data:image/") {
                    return Err(Error::InvalidInput(
                        "Only image files can be uploaded".to_string(),
                    ));
                }
                Form::new().text("file", url)
            }
        };
        Ok(form
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", self.config.folder.clone()))
    }
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    #[instrument(skip(self, image), fields(subsystem = "gateway", component = "cloudinary", op = "upload"))]
    async fn upload(&self, image: ImageSource) -> Result<String> {
        let start = Instant::now();
        let form = self.form(image)?;

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<UploadError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(
                http_status = status.as_u16(),
                error = %detail,
                duration_ms = start.elapsed().as_millis() as u64,
                "Image upload failed"
            );
            return Err(Error::Request(format!("Cloudinary returned {}: {}", status, detail)));
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(
            public_id = uploaded.public_id.as_deref().unwrap_or_default(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Image uploaded"
        );
        Ok(uploaded.secure_url)
    }
}
