//! Phase one of an upload: raw bytes in, upload token out

use tracing::{error, info};

use crate::asset::ImageAsset;
use crate::photos_api::{PhotosLibrary, UploadToken};

/// Upload the file's bytes. Failures are logged and reported as `None`.
pub async fn upload_file(library: &dyn PhotosLibrary, asset: &ImageAsset) -> Option<UploadToken> {
    let bytes = match tokio::fs::read(&asset.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Error uploading {}: {}", asset.file_name, e);
            return None;
        }
    };

    info!("Uploading {} ({} bytes)", asset.file_name, bytes.len());

    match library.upload_bytes(&asset.file_name, bytes).await {
        Ok(token) => Some(token),
        Err(e) => {
            error!("Failed to upload {}: {}", asset.file_name, e);
            None
        }
    }
}
