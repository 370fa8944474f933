//! Phase two of an upload: turn an upload token into a media item

use tracing::{error, info};

use crate::photos_api::{BatchCreateRequest, NewMediaItem, PhotosLibrary, SimpleMediaItem, UploadToken};

/// Per-item status message the API reports on success
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome of committing one upload token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItemResult {
    Created { id: String },
    Failed { file_name: String, reason: String },
}

impl MediaItemResult {
    pub fn media_item_id(&self) -> Option<&str> {
        match self {
            MediaItemResult::Created { id } => Some(id),
            MediaItemResult::Failed { .. } => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, MediaItemResult::Created { .. })
    }
}

/// Single-item batchCreate body. Consumes the token.
pub fn build_request(
    token: UploadToken,
    file_name: &str,
    caption: Option<&str>,
    album_id: Option<&str>,
) -> BatchCreateRequest {
    BatchCreateRequest {
        album_id: album_id.map(str::to_string),
        new_media_items: vec![NewMediaItem {
            description: caption.map(str::to_string),
            simple_media_item: SimpleMediaItem {
                upload_token: token.into_inner(),
                file_name: file_name.to_string(),
            },
        }],
    }
}

/// Create the media item for `token`, optionally inside `album_id`.
pub async fn commit(
    library: &dyn PhotosLibrary,
    token: UploadToken,
    file_name: &str,
    caption: Option<&str>,
    album_id: Option<&str>,
) -> MediaItemResult {
    let request = build_request(token, file_name, caption, album_id);

    let failed = |reason: String| {
        error!("Failed to create media item for {}: {}", file_name, reason);
        MediaItemResult::Failed {
            file_name: file_name.to_string(),
            reason,
        }
    };

    let response = match library.batch_create(&request).await {
        Ok(response) => response,
        Err(e) => return failed(e.to_string()),
    };

    let Some(result) = response.new_media_item_results.into_iter().next() else {
        return failed("empty response".to_string());
    };

    let succeeded = result
        .status
        .as_ref()
        .and_then(|status| status.message.as_deref())
        == Some(SUCCESS_MESSAGE);

    match (succeeded, result.media_item) {
        (true, Some(item)) => {
            info!("Created media item for {}", file_name);
            MediaItemResult::Created { id: item.id }
        }
        (true, None) => failed("success status without a media item".to_string()),
        (false, _) => failed(
            result
                .status
                .map(|status| status.to_string())
                .unwrap_or_else(|| "missing status".to_string()),
        ),
    }
}
