//! Album creation, verification and membership

use tracing::{error, info};

use crate::photos_api::PhotosLibrary;

/// Create an album titled `title` and return its id
pub async fn create_album(library: &dyn PhotosLibrary, title: &str) -> Option<String> {
    match library.create_album(title).await {
        Ok(album) => {
            info!("Created album '{}' with ID: {}", title, album.id);
            Some(album.id)
        }
        Err(e) => {
            error!("Error creating album: {}", e);
            None
        }
    }
}

/// Check that `album_id` exists and is visible to this app
pub async fn verify_album(library: &dyn PhotosLibrary, album_id: &str) -> bool {
    match library.get_album(album_id).await {
        Ok(album) => {
            info!(
                "Verified album access: {}",
                album.title.as_deref().unwrap_or("Unknown")
            );
            true
        }
        Err(e) => {
            error!("Cannot access album {}: {}", album_id, e);
            false
        }
    }
}

/// Add existing media items to an album
pub async fn add_to_album(library: &dyn PhotosLibrary, album_id: &str, media_item_ids: &[String]) -> bool {
    if media_item_ids.is_empty() {
        return true;
    }

    match library.batch_add_media_items(album_id, media_item_ids).await {
        Ok(()) => {
            info!("Added {} item(s) to album {}", media_item_ids.len(), album_id);
            true
        }
        Err(e) => {
            error!("Error adding items to album {}: {}", album_id, e);
            false
        }
    }
}
