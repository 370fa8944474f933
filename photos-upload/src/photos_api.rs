//! Google Photos Library API client
//!
//! Covers the calls the uploader needs: raw byte upload, media item
//! creation, and album create/get/batchAddMediaItems.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::auth::AccessTokenSource;

pub const PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1";
pub const UPLOAD_URL: &str = "https://photoslibrary.googleapis.com/v1/uploads";

/// Opaque token returned by the raw byte upload.
///
/// Not `Clone`: a token is moved into exactly one media item creation.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadToken(String);

impl UploadToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Album resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub is_writeable: Option<bool>,
    #[serde(default)]
    pub media_items_count: Option<String>,
}

/// Media item resource (only the fields the uploader reads)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

// ============================================================================
// mediaItems:batchCreate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    pub new_media_items: Vec<NewMediaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub simple_media_item: SimpleMediaItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMediaItem {
    pub upload_token: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    #[serde(default)]
    pub new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItemResult {
    #[serde(default)]
    pub upload_token: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub media_item: Option<MediaItem>,
}

/// google.rpc.Status as returned per item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.message.as_deref()) {
            (Some(code), Some(message)) => write!(f, "{} (code {})", message, code),
            (None, Some(message)) => write!(f, "{}", message),
            (Some(code), None) => write!(f, "code {}", code),
            (None, None) => write!(f, "empty status"),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateAlbumRequest<'a> {
    album: NewAlbum<'a>,
}

#[derive(Debug, Serialize)]
struct NewAlbum<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchAddMediaItemsRequest<'a> {
    media_item_ids: &'a [String],
}

// ============================================================================
// Remote-call surface
// ============================================================================

/// The authenticated Photos Library surface the upload pipeline calls through.
#[async_trait]
pub trait PhotosLibrary: Send + Sync {
    /// POST raw bytes; the 200 response body is the upload token.
    async fn upload_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadToken>;

    async fn batch_create(&self, request: &BatchCreateRequest) -> Result<BatchCreateResponse>;

    async fn create_album(&self, title: &str) -> Result<Album>;

    async fn get_album(&self, album_id: &str) -> Result<Album>;

    async fn batch_add_media_items(&self, album_id: &str, media_item_ids: &[String]) -> Result<()>;
}

/// Photos Library API client
pub struct PhotosClient {
    http_client: Client,
    tokens: Arc<dyn AccessTokenSource>,
    api_base: String,
    upload_url: String,
}

impl PhotosClient {
    /// Client against the public Google endpoints
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_endpoints(tokens, PHOTOS_API_BASE, UPLOAD_URL)
    }

    /// Client against custom endpoints (proxies, tests)
    pub fn with_endpoints(
        tokens: Arc<dyn AccessTokenSource>,
        api_base: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client: Client::new(),
            tokens,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into(),
        }
    }

    async fn bearer(&self) -> Result<String> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token))
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Photos API error ({}): {}", status, body));
        }
        Ok(response)
    }
}

#[async_trait]
impl PhotosLibrary for PhotosClient {
    async fn upload_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadToken> {
        debug!("upload_bytes: {} ({} bytes)", file_name, bytes.len());

        let response = self
            .http_client
            .post(&self.upload_url)
            .header(AUTHORIZATION, self.bearer().await?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("X-Goog-Upload-File-Name", file_name)
            .header("X-Goog-Upload-Protocol", "raw")
            .body(bytes)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} - {}", status.as_u16(), body));
        }

        Ok(UploadToken::new(response.text().await?))
    }

    async fn batch_create(&self, request: &BatchCreateRequest) -> Result<BatchCreateResponse> {
        let url = format!("{}/mediaItems:batchCreate", self.api_base);
        debug!("batch_create: {} item(s)", request.new_media_items.len());

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.bearer().await?)
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn create_album(&self, title: &str) -> Result<Album> {
        let url = format!("{}/albums", self.api_base);

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.bearer().await?)
            .json(&CreateAlbumRequest {
                album: NewAlbum { title },
            })
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn get_album(&self, album_id: &str) -> Result<Album> {
        let url = format!("{}/albums/{}", self.api_base, urlencoding::encode(album_id));

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn batch_add_media_items(&self, album_id: &str, media_item_ids: &[String]) -> Result<()> {
        let url = format!(
            "{}/albums/{}:batchAddMediaItems",
            self.api_base,
            urlencoding::encode(album_id)
        );

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.bearer().await?)
            .json(&BatchAddMediaItemsRequest { media_item_ids })
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
