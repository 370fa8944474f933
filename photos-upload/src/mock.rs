//! In-memory Photos Library for tests
//!
//! Behaves like the real service where the pipeline cares: upload tokens
//! are single-use, every batchCreate makes a new media item, and albums
//! must exist before items can be placed in them.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::photos_api::{
    Album, BatchCreateRequest, BatchCreateResponse, MediaItem, NewMediaItemResult, PhotosLibrary,
    Status, UploadToken,
};

/// One recorded request against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Upload {
        file_name: String,
        size: usize,
    },
    BatchCreate {
        album_id: Option<String>,
        file_name: String,
        description: Option<String>,
    },
    CreateAlbum {
        title: String,
    },
    GetAlbum {
        album_id: String,
    },
    BatchAdd {
        album_id: String,
        media_item_ids: Vec<String>,
    },
}

/// Media item held by the mock library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub id: String,
    pub file_name: String,
    pub description: Option<String>,
    pub album_ids: Vec<String>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    albums: HashMap<String, Album>,
    /// Outstanding upload token -> file name
    tokens: HashMap<String, String>,
    items: Vec<StoredItem>,
    next_id: usize,
    failing_uploads: HashSet<String>,
    rejected_commits: HashSet<String>,
    fail_album_creation: bool,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Default)]
pub struct MockPhotosLibrary {
    state: Mutex<MockState>,
}

impl MockPhotosLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an existing album
    pub fn with_album(self, id: &str, title: Option<&str>) -> Self {
        self.state().albums.insert(
            id.to_string(),
            Album {
                id: id.to_string(),
                title: title.map(str::to_string),
                product_url: None,
                is_writeable: Some(true),
                media_items_count: None,
            },
        );
        self
    }

    /// Byte uploads for this file name answer with an error
    pub fn fail_upload_for(self, file_name: &str) -> Self {
        self.state().failing_uploads.insert(file_name.to_string());
        self
    }

    /// batchCreate for this file name returns a non-success status
    pub fn reject_commit_for(self, file_name: &str) -> Self {
        self.state().rejected_commits.insert(file_name.to_string());
        self
    }

    pub fn fail_album_creation(self) -> Self {
        self.state().fail_album_creation = true;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn media_items(&self) -> Vec<StoredItem> {
        self.state().items.clone()
    }

    pub fn album(&self, id: &str) -> Option<Album> {
        self.state().albums.get(id).cloned()
    }
}

#[async_trait]
impl PhotosLibrary for MockPhotosLibrary {
    async fn upload_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadToken> {
        let mut state = self.state();
        state.calls.push(MockCall::Upload {
            file_name: file_name.to_string(),
            size: bytes.len(),
        });

        if state.failing_uploads.contains(file_name) {
            return Err(anyhow!("500 - upload rejected"));
        }

        let token = state.next_id("upload-token");
        state.tokens.insert(token.clone(), file_name.to_string());
        Ok(UploadToken::new(token))
    }

    async fn batch_create(&self, request: &BatchCreateRequest) -> Result<BatchCreateResponse> {
        let mut state = self.state();

        if let Some(album_id) = &request.album_id {
            if !state.albums.contains_key(album_id) {
                return Err(anyhow!("Photos API error (400 Bad Request): unknown album {}", album_id));
            }
        }

        let mut results = Vec::with_capacity(request.new_media_items.len());
        for item in &request.new_media_items {
            let simple = &item.simple_media_item;
            state.calls.push(MockCall::BatchCreate {
                album_id: request.album_id.clone(),
                file_name: simple.file_name.clone(),
                description: item.description.clone(),
            });

            let status = |code: i32, message: &str| {
                Some(Status {
                    code: Some(code),
                    message: Some(message.to_string()),
                })
            };

            if state.tokens.remove(&simple.upload_token).is_none() {
                results.push(NewMediaItemResult {
                    upload_token: Some(simple.upload_token.clone()),
                    status: status(3, "Invalid upload token"),
                    media_item: None,
                });
                continue;
            }

            if state.rejected_commits.contains(&simple.file_name) {
                results.push(NewMediaItemResult {
                    upload_token: Some(simple.upload_token.clone()),
                    status: status(13, "Failed: There was an error while trying to create this media item."),
                    media_item: None,
                });
                continue;
            }

            let id = state.next_id("media");
            state.items.push(StoredItem {
                id: id.clone(),
                file_name: simple.file_name.clone(),
                description: item.description.clone(),
                album_ids: request.album_id.iter().cloned().collect(),
            });
            results.push(NewMediaItemResult {
                upload_token: Some(simple.upload_token.clone()),
                status: Some(Status {
                    code: None,
                    message: Some("Success".to_string()),
                }),
                media_item: Some(MediaItem {
                    id,
                    description: item.description.clone(),
                    product_url: None,
                    filename: Some(simple.file_name.clone()),
                }),
            });
        }

        Ok(BatchCreateResponse {
            new_media_item_results: results,
        })
    }

    async fn create_album(&self, title: &str) -> Result<Album> {
        let mut state = self.state();
        state.calls.push(MockCall::CreateAlbum {
            title: title.to_string(),
        });

        if state.fail_album_creation {
            return Err(anyhow!("Photos API error (403 Forbidden): insufficient scopes"));
        }

        let id = state.next_id("album");
        let album = Album {
            id: id.clone(),
            title: Some(title.to_string()),
            product_url: None,
            is_writeable: Some(true),
            media_items_count: None,
        };
        state.albums.insert(id, album.clone());
        Ok(album)
    }

    async fn get_album(&self, album_id: &str) -> Result<Album> {
        let mut state = self.state();
        state.calls.push(MockCall::GetAlbum {
            album_id: album_id.to_string(),
        });

        state
            .albums
            .get(album_id)
            .cloned()
            .ok_or_else(|| anyhow!("Photos API error (404 Not Found): album {} not found", album_id))
    }

    async fn batch_add_media_items(&self, album_id: &str, media_item_ids: &[String]) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::BatchAdd {
            album_id: album_id.to_string(),
            media_item_ids: media_item_ids.to_vec(),
        });

        if !state.albums.contains_key(album_id) {
            return Err(anyhow!("Photos API error (404 Not Found): album {} not found", album_id));
        }

        for item in state.items.iter_mut().filter(|item| media_item_ids.contains(&item.id)) {
            if !item.album_ids.iter().any(|id| id == album_id) {
                item.album_ids.push(album_id.to_string());
            }
        }
        Ok(())
    }
}
